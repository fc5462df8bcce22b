//! Command dispatch: resolves credentials, probes the login, then drives the
//! batch worker and narrates its event stream to the terminal.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::{Cli, Command, ConnectionArgs, ProfileAction, RunArgs};
use crate::db::batch::{split_statements, BatchEvent, BatchExecutor, ResultTable};
use crate::db::catalog;
use crate::db::client::ServerDriver;
use crate::db::connection::ConnectionInfo;
use crate::db::login::{spawn_probe, LoginOutcome};
use crate::db::mssql::MssqlDriver;
use crate::error::{Error, Result};
use crate::utils::config::{ConnectionProfile, ProfileStore};
use crate::utils::export;

const LOGIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct App {
    store: ProfileStore,
}

impl App {
    pub fn new() -> Result<Self> {
        Ok(Self {
            store: ProfileStore::open_default()?,
        })
    }

    pub fn run(&mut self, cli: Cli) -> Result<()> {
        match cli.command {
            Command::Run(args) => self.handle_run(&cli.connection, args),
            Command::Databases => self.handle_databases(&cli.connection),
            Command::Profiles { action } => self.handle_profiles(&cli.connection, action),
        }
    }

    /// Merge a saved profile (if named) with the connection flags; any flag
    /// given on the command line wins over the profile field.
    fn resolve_connection(&self, args: &ConnectionArgs) -> Result<ConnectionInfo> {
        let mut info = match &args.profile {
            Some(name) => self
                .store
                .get(name)
                .map(ConnectionProfile::to_info)
                .ok_or_else(|| Error::Config(format!("no saved profile named '{name}'")))?,
            None => ConnectionInfo::default(),
        };

        if let Some(server) = &args.server {
            info.server = server.clone();
        }
        if let Some(username) = &args.username {
            info.username = username.clone();
        }
        if let Some(password) = &args.password {
            info.password = password.clone();
        }
        if let Some(driver) = &args.driver {
            info.driver = driver.clone();
        }
        if args.windows_auth {
            info.use_windows_auth = true;
        }

        info.validate()?;
        Ok(info)
    }

    /// Probe the login on its worker thread before committing to a batch,
    /// so bad credentials fail with one clear message instead of once per
    /// target database.
    fn check_login(driver: &Arc<MssqlDriver>, info: &ConnectionInfo) -> Result<()> {
        println!("Connecting as {} ...", info.display_string());
        let probe = spawn_probe(Arc::clone(driver), info.clone());
        let outcome = loop {
            match probe.poll() {
                Some(outcome) => break outcome,
                None => thread::sleep(LOGIN_POLL_INTERVAL),
            }
        };
        match outcome {
            LoginOutcome::Success => {
                println!("Login successful.");
                Ok(())
            }
            LoginOutcome::Failure(message) => Err(Error::Connection(message)),
        }
    }

    fn handle_run(&mut self, connection: &ConnectionArgs, args: RunArgs) -> Result<()> {
        let info = self.resolve_connection(connection)?;
        let driver = Arc::new(MssqlDriver::new()?);
        Self::check_login(&driver, &info)?;

        if let Some(name) = &args.save_profile {
            self.save_profile(name, &info)?;
        }

        let script = match (&args.sql, &args.file) {
            (Some(sql), _) => sql.clone(),
            (None, Some(path)) => export::load_script(path)?,
            (None, None) => {
                return Err(Error::Config(
                    "no script given; pass --sql or --file".to_string(),
                ))
            }
        };
        let statements = split_statements(&script);
        if statements.is_empty() {
            return Err(Error::Config("the script contains no statements".to_string()));
        }

        let targets = self.resolve_targets(&driver, &info, &args)?;
        println!(
            "Running {} statement(s) against {} database(s).",
            statements.len(),
            targets.len()
        );

        let table = Self::run_batch(Arc::clone(&driver), info, targets, statements);

        if !table.is_empty() {
            Self::print_table(&table);
        }
        if let Some(path) = &args.export {
            if table.is_empty() {
                println!("There is no data to export.");
            } else {
                export::write_csv(path, &table)?;
                println!("Exported {} row(s) to {}", table.row_count(), path.display());
            }
        }
        Ok(())
    }

    /// Target list: either the databases named on the command line, in the
    /// given order, or every discovered user database sorted by name.
    fn resolve_targets(
        &self,
        driver: &Arc<MssqlDriver>,
        info: &ConnectionInfo,
        args: &RunArgs,
    ) -> Result<Vec<String>> {
        if !args.databases.is_empty() {
            return Ok(args.databases.clone());
        }
        if !args.all_databases {
            return Err(Error::Config(
                "no target databases; pass --databases or --all-databases".to_string(),
            ));
        }

        let mut names = catalog::list_databases(driver.as_ref(), info)?;
        if let Some(filter) = &args.filter {
            let needle = filter.to_lowercase();
            names.retain(|name| name.to_lowercase().contains(&needle));
        }
        names.sort();
        if names.is_empty() {
            return Err(Error::Config(
                "no databases matched the selection".to_string(),
            ));
        }
        Ok(names)
    }

    /// Run the batch on a worker thread and narrate its events here, the
    /// same split a windowed shell would use to stay responsive. The worker
    /// zeroes the password once the last descriptor has been built.
    fn run_batch<D>(
        driver: Arc<D>,
        info: ConnectionInfo,
        targets: Vec<String>,
        statements: Vec<String>,
    ) -> ResultTable
    where
        D: ServerDriver + Send + Sync + 'static,
    {
        let (sender, receiver) = mpsc::channel();

        let worker = thread::spawn(move || {
            let mut info = info;
            let mut executor = BatchExecutor::new();
            executor.run(driver.as_ref(), &info, &targets, &statements, &sender);
            info.clear_password();
            let _ = sender.send(BatchEvent::Finished);
            executor.results()
        });

        for event in &receiver {
            match event {
                BatchEvent::Log(line) => {
                    println!("[{}] {line}", chrono::Local::now().format("%H:%M:%S"));
                }
                BatchEvent::Progress { completed, total } => {
                    println!("Progress: {completed}/{total} database(s)");
                }
                BatchEvent::ResultUpdate(_) => {}
                BatchEvent::Finished => break,
            }
        }

        worker.join().unwrap_or_default()
    }

    fn print_table(table: &ResultTable) {
        let mut builder = Builder::default();
        builder.push_record(table.columns.clone());
        for row in &table.rows {
            builder.push_record(row.clone());
        }
        let mut rendered = builder.build();
        rendered.with(Style::sharp());
        println!("{rendered}");
        println!("{} row(s)", table.row_count());
    }

    fn handle_databases(&self, connection: &ConnectionArgs) -> Result<()> {
        let info = self.resolve_connection(connection)?;
        let driver = Arc::new(MssqlDriver::new()?);
        Self::check_login(&driver, &info)?;

        let names = catalog::list_databases(driver.as_ref(), &info)?;
        if names.is_empty() {
            println!("No user databases found.");
        }
        for name in names {
            println!("{name}");
        }
        Ok(())
    }

    /// Shared by `run --save-profile` and `profiles save`. Profiles only
    /// describe SQL logins, so Windows authentication is rejected on both
    /// paths.
    fn save_profile(&mut self, name: &str, info: &ConnectionInfo) -> Result<()> {
        if info.use_windows_auth {
            return Err(Error::Config(
                "profiles store SQL logins; Windows authentication cannot be saved".to_string(),
            ));
        }
        self.store.insert(name, ConnectionProfile::from_info(info));
        self.store.save()?;
        println!("Saved profile '{name}'.");
        Ok(())
    }

    fn handle_profiles(
        &mut self,
        connection: &ConnectionArgs,
        action: ProfileAction,
    ) -> Result<()> {
        match action {
            ProfileAction::List => {
                let names = self.store.names();
                if names.is_empty() {
                    println!("No saved profiles.");
                }
                for name in names {
                    println!("{name}");
                }
                Ok(())
            }
            ProfileAction::Save { name } => {
                let info = self.resolve_connection(connection)?;
                self.save_profile(&name, &info)
            }
            ProfileAction::Delete { name } => {
                if self.store.remove(&name) {
                    self.store.save()?;
                    println!("Deleted profile '{name}'.");
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::client::QueryRows;
    use crate::db::connection::DEFAULT_DRIVER;
    use crate::db::fake::{FakeDriver, FakeState};

    fn app_with_store(dir: &tempfile::TempDir) -> App {
        App {
            store: ProfileStore::open(dir.path().join("profiles.json")).expect("open store"),
        }
    }

    fn flags(profile: Option<&str>, driver: Option<&str>) -> ConnectionArgs {
        ConnectionArgs {
            profile: profile.map(str::to_string),
            server: Some("localhost".to_string()),
            username: Some("sa".to_string()),
            password: Some("pw".to_string()),
            driver: driver.map(str::to_string),
            windows_auth: false,
        }
    }

    fn saved_profile(driver: &str) -> ConnectionProfile {
        ConnectionProfile {
            server: "db.example.com".to_string(),
            username: "svc".to_string(),
            password: "s3cret".to_string(),
            driver: driver.to_string(),
        }
    }

    #[test]
    fn explicit_driver_flag_overrides_profile_driver() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = app_with_store(&dir);
        app.store.insert("prod", saved_profile("Saved Driver"));

        let info = app
            .resolve_connection(&flags(Some("prod"), Some("Flag Driver")))
            .expect("resolve");
        assert_eq!(info.driver, "Flag Driver");
    }

    #[test]
    fn profile_driver_is_kept_without_a_flag() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = app_with_store(&dir);
        app.store.insert("prod", saved_profile("Saved Driver"));

        let info = app
            .resolve_connection(&flags(Some("prod"), None))
            .expect("resolve");
        assert_eq!(info.driver, "Saved Driver");
    }

    #[test]
    fn driver_defaults_without_profile_or_flag() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = app_with_store(&dir);

        let info = app.resolve_connection(&flags(None, None)).expect("resolve");
        assert_eq!(info.driver, DEFAULT_DRIVER);
    }

    #[test]
    fn save_profile_rejects_windows_auth() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = app_with_store(&dir);

        let mut info = ConnectionInfo::default();
        info.server = "localhost".to_string();
        info.use_windows_auth = true;

        let err = app.save_profile("prod", &info).expect_err("should refuse");
        assert!(matches!(err, Error::Config(_)));
        assert!(app.store.is_empty());
    }

    #[test]
    fn save_profile_persists_sql_logins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = app_with_store(&dir);

        let info = ConnectionInfo::new("localhost", "sa", "pw", DEFAULT_DRIVER, false);
        app.save_profile("prod", &info).expect("save");
        assert_eq!(app.store.names(), vec!["prod".to_string()]);
    }

    #[test]
    fn run_batch_drives_the_worker_to_completion() {
        let mut state = FakeState::default();
        state.select_rows.insert(
            "alpha".to_string(),
            QueryRows {
                columns: vec!["id".to_string()],
                rows: vec![vec!["1".to_string()]],
            },
        );
        let driver = Arc::new(FakeDriver::new(state));

        let table = App::run_batch(
            Arc::clone(&driver),
            ConnectionInfo::new("localhost", "sa", "pw", DEFAULT_DRIVER, false),
            vec!["alpha".to_string()],
            vec!["SELECT id FROM t".to_string()],
        );

        assert_eq!(table.rows, vec![vec!["alpha".to_string(), "1".to_string()]]);
        assert!(driver.journal().contains(&"open alpha".to_string()));
    }
}
