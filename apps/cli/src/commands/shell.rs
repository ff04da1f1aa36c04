//! Interactive browser over one session.
//!
//! Keeps a current location, sort order and selection between commands.
//! Storage calls that need a login open the prompt in the middle of a
//! command and continue once it succeeds.

use super::browse::{print_containers, print_entries};
use super::{auth, browse, edit, split_object_path};
use crate::app::App;
use crate::output::{self, OutputFormat};
use crate::views::{breadcrumbs, Location, Selection, SortColumn, SortState};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use swift_storage::ListObjectsParams;
use tracing::debug;

const HELP: &str = "\
Commands:
  ls                      list the current location
  cd <name>|..|/<path>    change location
  pwd                     show the current location and its breadcrumbs
  jump <n>                go to breadcrumb n (0 is Root)
  sort <name|size|modified>
                          sort by a column; repeat to reverse
  select <name>           toggle selection of an entry
  select-all | clear      select every entry, or none
  rm-selected             delete the selected objects or containers
  get <name> [file|-]     download an object
  head <name>             show an object's headers
  put <file> [name]       upload a file here
  meta <name> key=value.. -key..
                          edit object metadata
  rm <name>               delete an object
  cp <name> <container/target>
                          server-side copy
  mkdir <container>       create a container
  rmdir <container>       empty and delete a container
  login | logout | status
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellCommand {
    Help,
    List,
    Cd(String),
    Pwd,
    Jump(usize),
    Sort(SortColumn),
    Select(String),
    SelectAll,
    Clear,
    RemoveSelected,
    Get(String, Option<PathBuf>),
    Head(String),
    Put(PathBuf, Option<String>),
    Meta {
        name: String,
        set: Vec<String>,
        unset: Vec<String>,
    },
    Remove(String),
    Copy(String, String),
    MakeContainer(String),
    RemoveContainer(String),
    Login,
    Logout,
    Status,
    Quit,
}

impl ShellCommand {
    fn parse(line: &str) -> Result<Option<Self>> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            return Ok(None);
        };
        let arg = |index: usize| -> Result<String> {
            match args.get(index) {
                Some(value) => Ok(value.to_string()),
                None => bail!("{command}: missing argument"),
            }
        };

        let parsed = match command {
            "help" | "?" => ShellCommand::Help,
            "ls" | "refresh" => ShellCommand::List,
            "cd" => ShellCommand::Cd(args.first().copied().unwrap_or("/").to_string()),
            "pwd" => ShellCommand::Pwd,
            "jump" => {
                let index = arg(0)?;
                match index.parse() {
                    Ok(index) => ShellCommand::Jump(index),
                    Err(_) => bail!("jump: expected a breadcrumb number, got {index:?}"),
                }
            }
            "sort" => {
                let column = arg(0)?;
                match SortColumn::from_str(&column, true) {
                    Ok(column) => ShellCommand::Sort(column),
                    Err(_) => bail!("sort: unknown column {column:?}"),
                }
            }
            "select" => ShellCommand::Select(arg(0)?),
            "select-all" => ShellCommand::SelectAll,
            "clear" => ShellCommand::Clear,
            "rm-selected" => ShellCommand::RemoveSelected,
            "get" => ShellCommand::Get(arg(0)?, args.get(1).map(PathBuf::from)),
            "head" => ShellCommand::Head(arg(0)?),
            "put" => ShellCommand::Put(PathBuf::from(arg(0)?), args.get(1).map(|s| s.to_string())),
            "meta" => {
                let name = arg(0)?;
                let mut set = Vec::new();
                let mut unset = Vec::new();
                for word in &args[1..] {
                    match word.strip_prefix('-') {
                        Some(key) => unset.push(key.to_string()),
                        None => set.push(word.to_string()),
                    }
                }
                ShellCommand::Meta { name, set, unset }
            }
            "rm" => ShellCommand::Remove(arg(0)?),
            "cp" => ShellCommand::Copy(arg(0)?, arg(1)?),
            "mkdir" => ShellCommand::MakeContainer(arg(0)?),
            "rmdir" => ShellCommand::RemoveContainer(arg(0)?),
            "login" => ShellCommand::Login,
            "logout" => ShellCommand::Logout,
            "status" => ShellCommand::Status,
            "quit" | "exit" | "q" => ShellCommand::Quit,
            other => bail!("Unknown command {other:?}, try 'help'"),
        };
        Ok(Some(parsed))
    }
}

/// Current location plus the state of its listing.
#[derive(Debug, Default)]
struct BrowserView {
    location: Location,
    sort: SortState,
    selection: Selection,
    /// Full names of the entries last listed.
    names: Vec<String>,
}

impl BrowserView {
    /// Full entry name for a name typed at the current location.
    fn entry_name(&self, name: &str) -> String {
        match &self.location {
            Location::Root => name.trim_end_matches('/').to_string(),
            Location::Container { prefix, .. } => format!("{prefix}{name}"),
        }
    }

    /// `(container, object)` for a name typed at the current location.
    fn object_path(&self, name: &str) -> Result<(String, String)> {
        if let Some(absolute) = name.strip_prefix('/') {
            return split_object_path(absolute);
        }
        match &self.location {
            Location::Root => split_object_path(name),
            Location::Container { container, prefix } => {
                Ok((container.clone(), format!("{prefix}{name}")))
            }
        }
    }

    fn object_arg(&self, name: &str) -> Result<String> {
        let (container, object) = self.object_path(name)?;
        Ok(format!("{container}/{object}"))
    }

    fn here(&self) -> String {
        match &self.location {
            Location::Root => String::new(),
            Location::Container { container, prefix } => format!("{container}/{prefix}"),
        }
    }

    fn move_to(&mut self, location: Location) {
        if location != self.location {
            self.location = location;
            self.selection.clear();
            self.names.clear();
        }
    }

    async fn refresh(&mut self, app: &App, format: &OutputFormat) -> Result<()> {
        let selection = &self.selection;
        match &self.location {
            Location::Root => {
                let mut listing = app.client.list_containers().await?;
                self.sort.sort_containers(&mut listing);
                self.names = listing.iter().map(|c| c.name.clone()).collect();
                print_containers(&listing, format)?;
            }
            Location::Container { container, prefix } => {
                let mut entries = app
                    .client
                    .list_objects(container, &ListObjectsParams::directory(prefix.clone()))
                    .await?;
                self.sort.sort_entries(&mut entries);
                self.names = entries.iter().map(|e| e.name().to_string()).collect();
                let is_selected = |name: &str| selection.is_selected(name);
                print_entries(&self.location, &entries, false, Some(&is_selected), format)?;
            }
        }
        if *format == OutputFormat::Text {
            let direction = if self.sort.descending { "desc" } else { "asc" };
            let mut footer = format!(
                "  sorted by {:?} ({direction}), {} selected",
                self.sort.column,
                self.selection.len()
            );
            if self.all_selected() {
                footer.push_str(" (all)");
            }
            println!("{footer}");
        }
        Ok(())
    }

    fn all_selected(&self) -> bool {
        self.selection
            .all_selected(self.names.iter().map(String::as_str))
    }
}

/// Run the interactive shell until `quit` or end of input.
pub async fn shell(app: &App, downloads_dir: &Path, format: &OutputFormat) -> Result<()> {
    let mut view = BrowserView::default();
    println!("Swift browser shell. Type 'help' for commands.");

    loop {
        let Some(line) = read_command(&view.location.display()).await? else {
            break;
        };
        let command = match ShellCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                output::print_error(&e.to_string(), format);
                continue;
            }
        };
        debug!(?command, "Shell command");
        if command == ShellCommand::Quit {
            break;
        }
        if let Err(e) = execute(app, &mut view, command, downloads_dir, format).await {
            output::print_error(&format!("{e:#}"), format);
        }
    }
    Ok(())
}

async fn execute(
    app: &App,
    view: &mut BrowserView,
    command: ShellCommand,
    downloads_dir: &Path,
    format: &OutputFormat,
) -> Result<()> {
    let client = &app.client;
    match command {
        ShellCommand::Help => println!("{HELP}"),
        ShellCommand::List => view.refresh(app, format).await?,
        ShellCommand::Cd(name) => {
            let target = view.location.enter(&name);
            view.move_to(target);
            view.refresh(app, format).await?;
        }
        ShellCommand::Pwd => {
            println!("{}", view.location.display());
            for (index, crumb) in breadcrumbs(&view.location).iter().enumerate() {
                println!("  {index}: {}", crumb.title);
            }
        }
        ShellCommand::Jump(index) => {
            let Some(crumb) = breadcrumbs(&view.location).into_iter().nth(index) else {
                bail!("No breadcrumb {index}");
            };
            view.move_to(crumb.location);
            view.refresh(app, format).await?;
        }
        ShellCommand::Sort(column) => {
            view.sort.toggle(column);
            view.refresh(app, format).await?;
        }
        ShellCommand::Select(name) => {
            let name = view.entry_name(&name);
            if !view.names.contains(&name) {
                bail!("No entry named {name:?} here");
            }
            let selected = view.selection.toggle(&name);
            println!("{} {name}", if selected { "Selected" } else { "Deselected" });
        }
        ShellCommand::SelectAll => {
            view.selection
                .select_all(view.names.iter().map(String::as_str));
            println!("{} selected", view.selection.len());
        }
        ShellCommand::Clear => view.selection.clear(),
        ShellCommand::RemoveSelected => {
            remove_selected(app, view, format).await?;
            view.refresh(app, format).await?;
        }
        ShellCommand::Get(name, destination) => {
            let path = view.object_arg(&name)?;
            browse::get(client, &path, destination.as_deref(), downloads_dir, format).await?;
        }
        ShellCommand::Head(name) => browse::head(client, &view.object_arg(&name)?, format).await?,
        ShellCommand::Put(local, name) => {
            let target = match name {
                Some(name) => view.object_arg(&name)?,
                None => view.here(),
            };
            if target.is_empty() {
                bail!("put: cd into a container first");
            }
            edit::put(client, &local, &target, None, format).await?;
            view.refresh(app, format).await?;
        }
        ShellCommand::Meta { name, set, unset } => {
            edit::meta(client, &view.object_arg(&name)?, &set, &unset, format).await?
        }
        ShellCommand::Remove(name) => {
            edit::rm(client, &[view.object_arg(&name)?], format).await?;
            view.refresh(app, format).await?;
        }
        ShellCommand::Copy(name, target) => {
            edit::cp(client, &view.object_arg(&name)?, &target, format).await?
        }
        ShellCommand::MakeContainer(container) => {
            edit::mkdir(client, &container, format).await?;
            view.refresh(app, format).await?;
        }
        ShellCommand::RemoveContainer(container) => {
            edit::rmdir(client, &container, format).await?;
            if matches!(&view.location, Location::Container { container: c, .. } if *c == container) {
                view.move_to(Location::Root);
            }
            view.refresh(app, format).await?;
        }
        ShellCommand::Login => auth::login(app, format).await?,
        ShellCommand::Logout => auth::logout(app, format)?,
        ShellCommand::Status => auth::status(app, format)?,
        ShellCommand::Quit => {}
    }
    Ok(())
}

/// Delete every selected entry: containers at the root, objects elsewhere.
async fn remove_selected(app: &App, view: &mut BrowserView, format: &OutputFormat) -> Result<()> {
    if view.selection.is_empty() {
        bail!("Nothing selected");
    }
    let names: Vec<String> = view.selection.names().map(str::to_string).collect();
    match &view.location {
        Location::Root => {
            for container in &names {
                edit::rmdir(&app.client, container, format).await?;
            }
        }
        Location::Container { container, .. } => {
            for name in names.iter().filter(|n| !n.ends_with('/')) {
                app.client.delete_object(container, name).await?;
                output::print_success(&format!("Deleted {container}/{name}"), format);
            }
        }
    }
    view.selection.clear();
    Ok(())
}

async fn read_command(location: &str) -> Result<Option<String>> {
    let prompt = format!("swift:{location}> ");
    tokio::task::spawn_blocking(move || -> Result<Option<String>> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ShellCommand::parse("   ").unwrap(), None);
        assert_eq!(
            ShellCommand::parse("cd reports").unwrap(),
            Some(ShellCommand::Cd("reports".to_string()))
        );
        assert_eq!(
            ShellCommand::parse("cd").unwrap(),
            Some(ShellCommand::Cd("/".to_string()))
        );
        assert_eq!(
            ShellCommand::parse("sort SIZE").unwrap(),
            Some(ShellCommand::Sort(SortColumn::Size))
        );
        assert_eq!(
            ShellCommand::parse("meta a.txt color=blue -size").unwrap(),
            Some(ShellCommand::Meta {
                name: "a.txt".to_string(),
                set: vec!["color=blue".to_string()],
                unset: vec!["size".to_string()],
            })
        );
        assert_eq!(
            ShellCommand::parse("jump 2").unwrap(),
            Some(ShellCommand::Jump(2))
        );
        assert!(ShellCommand::parse("jump up").is_err());
        assert!(ShellCommand::parse("cp only-one").is_err());
        assert!(ShellCommand::parse("sort colour").is_err());
        assert!(ShellCommand::parse("frobnicate").is_err());
    }

    #[test]
    fn test_object_paths_are_relative_to_location() {
        let mut view = BrowserView::default();
        assert!(view.object_path("a.txt").is_err());
        assert_eq!(
            view.object_path("docs/a.txt").unwrap(),
            ("docs".to_string(), "a.txt".to_string())
        );

        view.move_to(Location::parse("docs/reports"));
        assert_eq!(
            view.object_path("q1.csv").unwrap(),
            ("docs".to_string(), "reports/q1.csv".to_string())
        );
        assert_eq!(
            view.object_path("/photos/cat.jpg").unwrap(),
            ("photos".to_string(), "cat.jpg".to_string())
        );
        assert_eq!(view.entry_name("2024/"), "reports/2024/");
        assert_eq!(view.here(), "docs/reports/");
    }

    #[test]
    fn test_moving_clears_selection() {
        let mut view = BrowserView {
            names: vec!["a".to_string()],
            ..BrowserView::default()
        };
        view.selection.toggle("a");
        assert!(view.all_selected());

        view.move_to(Location::parse("docs"));
        assert!(view.selection.is_empty());
        assert!(!view.all_selected());
    }
}
