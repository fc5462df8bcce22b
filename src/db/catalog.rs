use crate::db::client::{ServerConnection, ServerDriver};
use crate::db::connection::ConnectionInfo;
use crate::error::{Error, Result};

/// Catalog used for discovery and connection tests.
pub const ADMIN_DATABASE: &str = "master";

/// System databases occupy the lowest catalog ids; everything above is a
/// user database.
const DISCOVERY_QUERY: &str = "SELECT name FROM sys.databases WHERE database_id > 4";

/// List the user databases on the instance. A failure here is fatal to
/// discovery only; the shell stays usable with an empty selectable list.
pub fn list_databases<D: ServerDriver>(driver: &D, info: &ConnectionInfo) -> Result<Vec<String>> {
    let mut connection = driver
        .open(&info.connection_string(ADMIN_DATABASE))
        .map_err(|err| Error::Discovery(err.to_string()))?;

    let result = connection
        .query(DISCOVERY_QUERY)
        .map_err(|err| Error::Discovery(err.to_string()))?;

    Ok(result
        .rows
        .into_iter()
        .filter_map(|row| row.into_iter().next())
        .collect())
}
