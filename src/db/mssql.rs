//! SQL Server transport backed by tiberius.
//!
//! The TDS client is async; each call is driven to completion on a private
//! tokio runtime so the batch worker keeps its plain blocking model. The
//! descriptor accepted by [`MssqlDriver::open`] is the ODBC-style string
//! built by `ConnectionInfo::connection_string`; the `DRIVER` key is ODBC
//! heritage carried by the profile format and is ignored here.

use std::sync::Arc;

use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::db::client::{QueryRows, ServerConnection, ServerDriver};
use crate::error::{Error, Result};

pub struct MssqlDriver {
    runtime: Arc<Runtime>,
}

impl MssqlDriver {
    pub fn new() -> Result<Self> {
        let runtime = Runtime::new()
            .map_err(|err| Error::Connection(format!("failed to start I/O runtime: {err}")))?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }
}

impl ServerDriver for MssqlDriver {
    type Connection = MssqlConnection;

    fn open(&self, descriptor: &str) -> Result<MssqlConnection> {
        let settings = DescriptorSettings::parse(descriptor)?;
        let config = settings.to_config()?;

        let client = self.runtime.block_on(async {
            let tcp = TcpStream::connect(config.get_addr())
                .await
                .map_err(|err| Error::Connection(err.to_string()))?;
            tcp.set_nodelay(true)
                .map_err(|err| Error::Connection(err.to_string()))?;
            Client::connect(config, tcp.compat_write())
                .await
                .map_err(|err| Error::Connection(err.to_string()))
        })?;

        Ok(MssqlConnection {
            runtime: Arc::clone(&self.runtime),
            client,
        })
    }
}

pub struct MssqlConnection {
    runtime: Arc<Runtime>,
    client: Client<Compat<TcpStream>>,
}

impl ServerConnection for MssqlConnection {
    fn query(&mut self, sql: &str) -> Result<QueryRows> {
        let client = &mut self.client;
        self.runtime.block_on(async move {
            let mut stream = client
                .query(sql, &[])
                .await
                .map_err(|err| Error::Statement(err.to_string()))?;

            // Column metadata is read off the stream before the rows so a
            // zero-row SELECT still yields a usable header.
            let columns: Vec<String> = stream
                .columns()
                .await
                .map_err(|err| Error::Statement(err.to_string()))?
                .map(|cols| cols.iter().map(|col| col.name().to_string()).collect())
                .unwrap_or_default();

            let fetched = stream
                .into_first_result()
                .await
                .map_err(|err| Error::Statement(err.to_string()))?;

            let mut rows = Vec::with_capacity(fetched.len());
            for row in fetched {
                rows.push(row.into_iter().map(column_data_to_string).collect());
            }

            Ok(QueryRows { columns, rows })
        })
    }

    fn execute(&mut self, sql: &str) -> Result<i64> {
        let client = &mut self.client;
        self.runtime.block_on(async move {
            let result = client
                .execute(sql, &[])
                .await
                .map_err(|err| Error::Statement(err.to_string()))?;
            Ok(result.rows_affected().iter().sum::<u64>() as i64)
        })
    }

    fn commit(&mut self) -> Result<()> {
        // The session runs in autocommit mode; this flushes any transaction
        // a statement opened explicitly (e.g. a script with BEGIN TRAN).
        self.execute("IF @@TRANCOUNT > 0 COMMIT TRANSACTION")
            .map(|_| ())
    }
}

/// Render one TDS value to its display string; SQL NULL becomes `"NULL"`.
fn column_data_to_string(data: ColumnData<'static>) -> String {
    fn opt<T: ToString>(value: Option<T>) -> String {
        value.map_or_else(|| "NULL".to_string(), |v| v.to_string())
    }

    match data {
        ColumnData::Bit(v) => opt(v),
        ColumnData::U8(v) => opt(v),
        ColumnData::I16(v) => opt(v),
        ColumnData::I32(v) => opt(v),
        ColumnData::I64(v) => opt(v),
        ColumnData::F32(v) => opt(v),
        ColumnData::F64(v) => opt(v),
        ColumnData::Numeric(v) => opt(v),
        ColumnData::Guid(v) => opt(v),
        ColumnData::String(v) => v.map_or_else(|| "NULL".to_string(), |s| s.into_owned()),
        ColumnData::Xml(v) => {
            v.map_or_else(|| "NULL".to_string(), |x| x.into_owned().into_string())
        }
        ColumnData::Binary(v) => v.map_or_else(
            || "NULL".to_string(),
            |bytes| {
                bytes
                    .iter()
                    .map(|b| format!("{b:02x}"))
                    .collect::<String>()
            },
        ),
        ColumnData::DateTime(v) => v.map_or_else(
            || "NULL".to_string(),
            |dt| {
                let date = chrono::NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or_default()
                    + chrono::Duration::days(dt.days() as i64);
                let time = chrono::NaiveTime::from_num_seconds_from_midnight_opt(
                    (dt.seconds_fragments() as f64 / 300.0) as u32,
                    0,
                )
                .unwrap_or_default();
                chrono::NaiveDateTime::new(date, time).to_string()
            },
        ),
        ColumnData::SmallDateTime(v) => v.map_or_else(
            || "NULL".to_string(),
            |dt| {
                let date = chrono::NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or_default()
                    + chrono::Duration::days(dt.days() as i64);
                let time = chrono::NaiveTime::from_num_seconds_from_midnight_opt(
                    (dt.seconds_fragments() as u32) * 60,
                    0,
                )
                .unwrap_or_default();
                chrono::NaiveDateTime::new(date, time).to_string()
            },
        ),
        ColumnData::DateTime2(v) => v.map_or_else(
            || "NULL".to_string(),
            |dt| datetime2_to_naive(&dt).to_string(),
        ),
        ColumnData::DateTimeOffset(v) => v.map_or_else(
            || "NULL".to_string(),
            |dto| {
                let naive = datetime2_to_naive(&dto.datetime2());
                chrono::DateTime::<chrono::Utc>::from_naive_utc_and_offset(naive, chrono::Utc)
                    .to_string()
            },
        ),
        ColumnData::Date(v) => v.map_or_else(
            || "NULL".to_string(),
            |d| {
                (chrono::NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or_default()
                    + chrono::Duration::days(d.days() as i64))
                .to_string()
            },
        ),
        ColumnData::Time(v) => v.map_or_else(|| "NULL".to_string(), |t| time_to_naive(&t).to_string()),
    }
}

fn datetime2_to_naive(dt: &tiberius::time::DateTime2) -> chrono::NaiveDateTime {
    let date = chrono::NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or_default()
        + chrono::Duration::days(dt.date().days() as i64);
    chrono::NaiveDateTime::new(date, time_to_naive(&dt.time()))
}

fn time_to_naive(time: &tiberius::time::Time) -> chrono::NaiveTime {
    chrono::NaiveTime::from_num_seconds_from_midnight_opt(
        (time.increments() / 10_000_000) as u32,
        ((time.increments() % 10_000_000) * 100) as u32,
    )
    .unwrap_or_default()
}

/// Parsed form of the ODBC-style descriptor. Unknown keys are tolerated so
/// descriptors written for other tooling still connect.
#[derive(Debug, Default, PartialEq, Eq)]
struct DescriptorSettings {
    server: String,
    port: Option<u16>,
    database: Option<String>,
    user: Option<String>,
    password: Option<String>,
    trusted: bool,
    trust_cert: bool,
    encrypt: Option<bool>,
}

impl DescriptorSettings {
    fn parse(raw: &str) -> Result<Self> {
        let mut settings = Self::default();

        for part in raw.split(';') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut kv = trimmed.splitn(2, '=');
            let key = kv.next().unwrap_or("").trim().to_lowercase();
            let value = kv.next().unwrap_or("").trim();
            match key.as_str() {
                "server" | "data source" | "address" => {
                    if let Some((host, port)) = value.split_once(',') {
                        settings.server = host.trim().to_string();
                        settings.port = port.trim().parse::<u16>().ok();
                    } else {
                        settings.server = value.to_string();
                    }
                }
                "database" | "initial catalog" => settings.database = Some(value.to_string()),
                "uid" | "user id" | "user" => settings.user = Some(value.to_string()),
                "pwd" | "password" => settings.password = Some(value.to_string()),
                "trusted_connection" | "integrated security" => {
                    settings.trusted = parse_bool(value);
                }
                "trustservercertificate" => settings.trust_cert = parse_bool(value),
                "encrypt" => settings.encrypt = Some(parse_bool(value)),
                // ODBC driver-manager key; the TDS transport has no use for it.
                "driver" => {}
                other => tracing::debug!(key = other, "ignoring descriptor key"),
            }
        }

        if settings.server.is_empty() {
            return Err(Error::Connection(
                "descriptor is missing the SERVER key".to_string(),
            ));
        }
        Ok(settings)
    }

    fn to_config(&self) -> Result<Config> {
        let mut config = Config::new();
        config.host(&self.server);
        config.port(self.port.unwrap_or(1433));
        if let Some(database) = &self.database {
            config.database(database);
        }
        if self.trust_cert {
            config.trust_cert();
        }
        match self.encrypt {
            Some(true) => config.encryption(EncryptionLevel::Required),
            Some(false) => config.encryption(EncryptionLevel::NotSupported),
            None => {}
        }

        if self.trusted {
            #[cfg(windows)]
            config.authentication(AuthMethod::Integrated);
            #[cfg(not(windows))]
            return Err(Error::Connection(
                "Trusted_Connection requires Windows integrated authentication".to_string(),
            ));
        } else {
            config.authentication(AuthMethod::sql_server(
                self.user.clone().unwrap_or_default(),
                self.password.clone().unwrap_or_default(),
            ));
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "yes" | "true" | "1" | "sspi"
    )
}
