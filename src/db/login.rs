use std::cell::Cell;
use std::sync::mpsc::{sync_channel, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

use crate::db::catalog::ADMIN_DATABASE;
use crate::db::client::ServerDriver;
use crate::db::connection::ConnectionInfo;

/// Terminal message of one login attempt. Exactly one is sent per probe.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Success,
    Failure(String),
}

/// Receiving side of a connection test running on its own thread, so the
/// initiating thread stays responsive while the driver blocks on I/O.
pub struct LoginProbe {
    receiver: Receiver<LoginOutcome>,
    finished: Cell<bool>,
}

/// Test the credentials against the admin catalog on a short-lived worker
/// thread. The handoff back is a single-slot channel carrying the one
/// terminal message, polled by the caller.
pub fn spawn_probe<D>(driver: Arc<D>, info: ConnectionInfo) -> LoginProbe
where
    D: ServerDriver + Send + Sync + 'static,
{
    let (sender, receiver) = sync_channel(1);

    thread::spawn(move || {
        let outcome = match driver.open(&info.connection_string(ADMIN_DATABASE)) {
            Ok(_connection) => LoginOutcome::Success,
            Err(err) => LoginOutcome::Failure(err.to_string()),
        };
        let _ = sender.send(outcome);
    });

    LoginProbe {
        receiver,
        finished: Cell::new(false),
    }
}

impl LoginProbe {
    /// Non-blocking poll. `None` while the probe is still connecting, and
    /// again after the terminal message has been consumed.
    pub fn poll(&self) -> Option<LoginOutcome> {
        if self.finished.get() {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(outcome) => {
                self.finished.set(true);
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.finished.set(true);
                Some(LoginOutcome::Failure(
                    "login worker exited without reporting an outcome".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fake::{FakeDriver, FakeState};
    use std::time::Duration;

    fn info() -> ConnectionInfo {
        ConnectionInfo::new("localhost", "sa", "pw", "driver", false)
    }

    fn wait_for(probe: &LoginProbe) -> LoginOutcome {
        for _ in 0..100 {
            if let Some(outcome) = probe.poll() {
                return outcome;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("probe never reported an outcome");
    }

    #[test]
    fn successful_probe_reports_success_once() {
        let driver = Arc::new(FakeDriver::new(FakeState::default()));
        let probe = spawn_probe(driver, info());

        assert!(matches!(wait_for(&probe), LoginOutcome::Success));
        // The single terminal message has been consumed.
        assert!(probe.poll().is_none());
    }

    #[test]
    fn refused_connection_reports_failure_message() {
        let mut state = FakeState::default();
        state
            .refuse_connect
            .insert(ADMIN_DATABASE.to_string(), "bad password".to_string());
        let driver = Arc::new(FakeDriver::new(state));
        let probe = spawn_probe(driver, info());

        match wait_for(&probe) {
            LoginOutcome::Failure(message) => assert!(message.contains("bad password")),
            LoginOutcome::Success => panic!("expected failure"),
        }
    }
}
