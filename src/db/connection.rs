use crate::error::{Error, Result};

pub const DEFAULT_DRIVER: &str = "ODBC Driver 17 for SQL Server";

/// Login parameters for one SQL Server instance. The target database is not
/// part of the info: a batch reuses the same credentials for every catalog
/// it connects to.
#[derive(Clone, Debug)]
pub struct ConnectionInfo {
    pub server: String,
    pub username: String,
    pub password: String,
    pub driver: String,
    pub use_windows_auth: bool,
}

impl ConnectionInfo {
    pub fn new(
        server: &str,
        username: &str,
        password: &str,
        driver: &str,
        use_windows_auth: bool,
    ) -> Self {
        Self {
            server: server.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            driver: driver.to_string(),
            use_windows_auth,
        }
    }

    /// Build the driver descriptor for one catalog. Credentials are embedded
    /// in clear text; under Windows authentication they are omitted and a
    /// trusted connection is requested instead.
    pub fn connection_string(&self, database: &str) -> String {
        if self.use_windows_auth {
            format!(
                "DRIVER={};SERVER={};Trusted_Connection=yes;DATABASE={}",
                self.driver, self.server, database
            )
        } else {
            format!(
                "DRIVER={};SERVER={};UID={};PWD={};DATABASE={}",
                self.driver, self.server, self.username, self.password, database
            )
        }
    }

    /// Password-free identity for prompts and log lines.
    pub fn display_string(&self) -> String {
        if self.use_windows_auth {
            format!("{} (windows auth)", self.server)
        } else {
            format!("{}@{}", self.username, self.server)
        }
    }

    /// Check that every field a session needs is present. Username and
    /// password are only required under SQL authentication.
    pub fn validate(&self) -> Result<()> {
        if self.server.is_empty() {
            return Err(Error::missing_field("server"));
        }
        if self.driver.is_empty() {
            return Err(Error::missing_field("driver"));
        }
        if !self.use_windows_auth {
            if self.username.is_empty() {
                return Err(Error::missing_field("username"));
            }
            if self.password.is_empty() {
                return Err(Error::missing_field("password"));
            }
        }
        Ok(())
    }

    /// Overwrite the password bytes in place before releasing them. Called
    /// once the last descriptor of a batch has been built, so the secret
    /// does not linger in freed memory.
    pub fn clear_password(&mut self) {
        // SAFETY: zero bytes are valid UTF-8, the buffer stays a valid String
        let bytes = unsafe { self.password.as_bytes_mut() };
        for b in bytes.iter_mut() {
            // write_volatile keeps the zeroing from being optimized away
            unsafe { std::ptr::write_volatile(b, 0) };
        }
        self.password.clear();
        self.password.shrink_to_fit();
    }
}

impl Default for ConnectionInfo {
    fn default() -> Self {
        Self {
            server: String::new(),
            username: "sa".to_string(),
            password: String::new(),
            driver: DEFAULT_DRIVER.to_string(),
            use_windows_auth: false,
        }
    }
}
