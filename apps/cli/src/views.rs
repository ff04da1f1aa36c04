//! Presentation helpers shared by the one-shot commands and the shell:
//! locations, breadcrumbs, item titles, sorting and selection.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use swift_storage::{ContainerInfo, ObjectEntry};

/// Where in the account a listing is shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Location {
    #[default]
    Root,
    /// A container, optionally inside a pseudo-directory. `prefix` is empty
    /// or ends with `/`.
    Container { container: String, prefix: String },
}

impl Location {
    /// Parse `container[/pseudo/dir]`. A directory without its trailing
    /// slash is normalized.
    pub fn parse(path: &str) -> Self {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            return Location::Root;
        }
        match path.split_once('/') {
            Some((container, rest)) => Location::Container {
                container: container.to_string(),
                prefix: directory_prefix(rest),
            },
            None => Location::Container {
                container: path.to_string(),
                prefix: String::new(),
            },
        }
    }

    /// Location reached by entering `name` (a container at the root, a
    /// pseudo-directory title otherwise), or `..` for the parent.
    pub fn enter(&self, name: &str) -> Self {
        if name == ".." {
            return self.parent();
        }
        if let Some(absolute) = name.strip_prefix('/') {
            return Location::parse(absolute);
        }
        match self {
            Location::Root => Location::parse(name),
            Location::Container { container, prefix } => Location::Container {
                container: container.clone(),
                prefix: directory_prefix(&format!("{prefix}{name}")),
            },
        }
    }

    pub fn parent(&self) -> Self {
        match self {
            Location::Root => Location::Root,
            Location::Container { prefix, .. } if prefix.is_empty() => Location::Root,
            Location::Container { container, prefix } => {
                let trimmed = prefix.trim_end_matches('/');
                let parent = match trimmed.rfind('/') {
                    Some(index) => trimmed[..=index].to_string(),
                    None => String::new(),
                };
                Location::Container {
                    container: container.clone(),
                    prefix: parent,
                }
            }
        }
    }

    /// `/` or `/container/prefix`.
    pub fn display(&self) -> String {
        match self {
            Location::Root => "/".to_string(),
            Location::Container { container, prefix } => format!("/{container}/{prefix}"),
        }
    }

    /// Heading shown above a listing.
    pub fn title(&self) -> String {
        match self {
            Location::Root => "Containers".to_string(),
            Location::Container { container, prefix } if prefix.is_empty() => container.clone(),
            Location::Container { prefix, .. } => {
                format!("{}/", last_component(prefix.trim_end_matches('/')))
            }
        }
    }
}

/// Append `/` to a non-empty pseudo-directory path that lacks it.
pub fn directory_prefix(path: &str) -> String {
    if path.is_empty() || path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

/// One step of the breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub title: String,
    pub location: Location,
}

/// `Root`, the container, then each pseudo-directory down to `location`.
pub fn breadcrumbs(location: &Location) -> Vec<Crumb> {
    let mut crumbs = vec![Crumb {
        title: "Root".to_string(),
        location: Location::Root,
    }];
    if let Location::Container { container, prefix } = location {
        crumbs.push(Crumb {
            title: container.clone(),
            location: Location::Container {
                container: container.clone(),
                prefix: String::new(),
            },
        });
        let mut path = String::new();
        for segment in prefix.split('/').filter(|s| !s.is_empty()) {
            path.push_str(segment);
            path.push('/');
            crumbs.push(Crumb {
                title: segment.to_string(),
                location: Location::Container {
                    container: container.clone(),
                    prefix: path.clone(),
                },
            });
        }
    }
    crumbs
}

pub fn render_breadcrumbs(location: &Location) -> String {
    breadcrumbs(location)
        .into_iter()
        .map(|crumb| crumb.title)
        .collect::<Vec<_>>()
        .join(" > ")
}

fn last_component(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Name shown for a listing entry: its last path component, with a trailing
/// `/` kept for pseudo-directories.
pub fn item_title(entry: &ObjectEntry) -> String {
    match entry {
        ObjectEntry::Subdir { subdir } => {
            format!("{}/", last_component(subdir.trim_end_matches('/')))
        }
        ObjectEntry::Object(info) => last_component(&info.name).to_string(),
    }
}

/// Column a listing is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortColumn {
    #[default]
    Name,
    Size,
    Modified,
}

/// Current sort column and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
    pub column: SortColumn,
    pub descending: bool,
}

impl SortState {
    /// Clicking the current column reverses it; another column starts ascending.
    pub fn toggle(&mut self, column: SortColumn) {
        if self.column == column {
            self.descending = !self.descending;
        } else {
            self.column = column;
            self.descending = false;
        }
    }

    fn apply(&self, ordering: Ordering) -> Ordering {
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }

    pub fn sort_entries(&self, entries: &mut [ObjectEntry]) {
        entries.sort_by(|a, b| {
            let ordering = match self.column {
                SortColumn::Name => Ordering::Equal,
                SortColumn::Size => entry_size(a).cmp(&entry_size(b)),
                SortColumn::Modified => {
                    let modified = |e: &ObjectEntry| e.as_object().map(|o| o.last_modified);
                    modified(a).cmp(&modified(b))
                }
            };
            self.apply(ordering.then_with(|| item_title(a).cmp(&item_title(b))))
        });
    }

    pub fn sort_containers(&self, containers: &mut [ContainerInfo]) {
        containers.sort_by(|a, b| {
            let ordering = match self.column {
                SortColumn::Size => a.bytes.cmp(&b.bytes),
                SortColumn::Name | SortColumn::Modified => Ordering::Equal,
            };
            self.apply(ordering.then_with(|| a.name.cmp(&b.name)))
        });
    }
}

fn entry_size(entry: &ObjectEntry) -> u64 {
    entry.as_object().map(|o| o.bytes).unwrap_or(0)
}

/// Selected entries of the current listing, by full name.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    names: BTreeSet<String>,
}

impl Selection {
    /// Select or deselect one name. Returns whether it is now selected.
    pub fn toggle(&mut self, name: &str) -> bool {
        if self.names.remove(name) {
            false
        } else {
            self.names.insert(name.to_string());
            true
        }
    }

    pub fn select_all<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        self.names.extend(names.into_iter().map(str::to_string));
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// True only if the listing is non-empty and every entry is selected.
    pub fn all_selected<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        let mut any = false;
        for name in names {
            any = true;
            if !self.names.contains(name) {
                return false;
            }
        }
        any
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swift_storage::ObjectInfo;

    fn object(name: &str, bytes: u64, modified: &str) -> ObjectEntry {
        ObjectEntry::Object(ObjectInfo {
            name: name.to_string(),
            bytes,
            last_modified: modified.parse().unwrap(),
            content_type: "text/plain".to_string(),
            hash: String::new(),
        })
    }

    fn subdir(name: &str) -> ObjectEntry {
        ObjectEntry::Subdir {
            subdir: name.to_string(),
        }
    }

    #[test]
    fn test_parse_normalizes_directory_path() {
        assert_eq!(Location::parse(""), Location::Root);
        assert_eq!(Location::parse("/"), Location::Root);
        assert_eq!(
            Location::parse("cont/a/b"),
            Location::Container {
                container: "cont".to_string(),
                prefix: "a/b/".to_string()
            }
        );
        assert_eq!(
            Location::parse("/cont/a/"),
            Location::Container {
                container: "cont".to_string(),
                prefix: "a/".to_string()
            }
        );
    }

    #[test]
    fn test_enter_and_parent() {
        let root = Location::Root;
        let cont = root.enter("cont");
        let nested = cont.enter("a").enter("b/");
        assert_eq!(nested.display(), "/cont/a/b/");
        assert_eq!(nested.parent().display(), "/cont/a/");
        assert_eq!(nested.parent().parent(), cont);
        assert_eq!(cont.parent(), Location::Root);
        assert_eq!(nested.enter("/other"), Location::parse("other"));
        assert_eq!(nested.enter(".."), nested.parent());
    }

    #[test]
    fn test_breadcrumbs() {
        let location = Location::parse("cont/a/b/");
        let crumbs = breadcrumbs(&location);

        let titles: Vec<&str> = crumbs.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Root", "cont", "a", "b"]);
        assert_eq!(crumbs[2].location, Location::parse("cont/a/"));
        assert_eq!(render_breadcrumbs(&Location::Root), "Root");
    }

    #[test]
    fn test_titles() {
        assert_eq!(Location::Root.title(), "Containers");
        assert_eq!(Location::parse("cont").title(), "cont");
        assert_eq!(Location::parse("cont/a/b").title(), "b/");
        assert_eq!(item_title(&subdir("a/b/")), "b/");
        assert_eq!(item_title(&object("a/b/c.txt", 1, "2024-01-01T00:00:00")), "c.txt");
        assert_eq!(item_title(&object("top.txt", 1, "2024-01-01T00:00:00")), "top.txt");
    }

    #[test]
    fn test_sort_toggle() {
        let mut state = SortState::default();
        state.toggle(SortColumn::Name);
        assert!(state.descending);
        state.toggle(SortColumn::Size);
        assert_eq!(state.column, SortColumn::Size);
        assert!(!state.descending);
        state.toggle(SortColumn::Size);
        assert!(state.descending);
    }

    #[test]
    fn test_sort_entries_by_size_and_name() {
        let mut entries = vec![
            object("big", 300, "2024-01-01T00:00:00"),
            subdir("dir/"),
            object("small", 1, "2024-01-02T00:00:00"),
        ];

        let mut state = SortState::default();
        state.sort_entries(&mut entries);
        let names: Vec<String> = entries.iter().map(item_title).collect();
        assert_eq!(names, vec!["big", "dir/", "small"]);

        state.toggle(SortColumn::Size);
        state.sort_entries(&mut entries);
        let names: Vec<String> = entries.iter().map(item_title).collect();
        assert_eq!(names, vec!["dir/", "small", "big"]);

        state.toggle(SortColumn::Size);
        state.sort_entries(&mut entries);
        let names: Vec<String> = entries.iter().map(item_title).collect();
        assert_eq!(names, vec!["big", "small", "dir/"]);
    }

    #[test]
    fn test_all_selected_is_false_for_empty_listing() {
        let selection = Selection::default();
        assert!(!selection.all_selected(std::iter::empty()));
    }

    #[test]
    fn test_selection() {
        let mut selection = Selection::default();
        assert!(selection.toggle("a"));
        assert!(!selection.all_selected(["a", "b"]));

        selection.select_all(["a", "b"]);
        assert!(selection.all_selected(["a", "b"]));
        assert_eq!(selection.len(), 2);

        assert!(!selection.toggle("a"));
        assert!(!selection.is_selected("a"));
        selection.clear();
        assert!(selection.is_empty());
    }
}
