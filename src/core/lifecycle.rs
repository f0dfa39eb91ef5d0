//! Connection lifecycle management
//!
//! Callers may hand in an open or a closed connection. The executor opens a
//! closed one and puts it back the way it found it:
//!
//! - scalar and non-query calls run inside a [`ConnectionScope`], which closes
//!   a connection it opened on every exit path;
//! - cursor-based calls (streaming and tabular) use [`open_for_cursor`] and
//!   defer the close to the cursor via [`CursorBehavior::CloseConnection`].
//!   If the driver fails to produce a cursor, nothing closes the connection.

use super::driver::{Connection, ConnectionState, CursorBehavior};
use super::error::Result;
use tracing::{debug, warn};

/// Guard that restores a connection's entry state
///
/// Use [`ConnectionScope::exit`] to observe close failures; dropping the
/// guard restores the state too but can only log a failure.
pub struct ConnectionScope<'c, C: Connection> {
    connection: &'c mut C,
    entry_state: ConnectionState,
    restored: bool,
}

impl<'c, C: Connection> ConnectionScope<'c, C> {
    /// Record the connection's state and open it if closed
    ///
    /// # Errors
    ///
    /// Returns the driver error if opening fails. A connection left half-open
    /// by the failed attempt is closed again.
    pub fn enter(connection: &'c mut C) -> Result<Self> {
        let entry_state = connection.state();
        if !entry_state.is_open() {
            debug!("Opening closed connection");
            if let Err(err) = connection.open() {
                if connection.state().is_open() {
                    if let Err(close_err) = connection.close() {
                        warn!(error = %close_err, "Failed to close connection after open error");
                    }
                }
                return Err(err);
            }
        }
        Ok(Self {
            connection,
            entry_state,
            restored: false,
        })
    }

    /// State the connection had when the scope was entered
    pub fn entry_state(&self) -> ConnectionState {
        self.entry_state
    }

    /// Whether this scope opened the connection
    pub fn opened_here(&self) -> bool {
        !self.entry_state.is_open()
    }

    pub fn connection(&mut self) -> &mut C {
        &mut *self.connection
    }

    /// Restore the entry state and report close failures
    pub fn exit(mut self) -> Result<()> {
        self.restore()
    }

    fn restore(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        if self.opened_here() && self.connection.state().is_open() {
            debug!("Closing connection opened for this call");
            self.connection.close()?;
        }
        Ok(())
    }
}

impl<C: Connection> Drop for ConnectionScope<'_, C> {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            warn!(error = %err, "Failed to restore connection state");
        }
    }
}

/// Prepare a connection for a cursor-based call
///
/// Opens a closed connection and returns
/// [`CursorBehavior::CloseConnection`] so the cursor closes it on release;
/// an already open connection is left to the caller.
pub fn open_for_cursor<C: Connection>(connection: &mut C) -> Result<CursorBehavior> {
    if connection.state().is_open() {
        return Ok(CursorBehavior::Default);
    }
    debug!("Opening closed connection for cursor; cursor release will close it");
    connection.open()?;
    Ok(CursorBehavior::CloseConnection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{Call, ScriptedConnection, Trace};

    #[test]
    fn test_scope_opens_and_closes_closed_connection() {
        let trace = Trace::default();
        let mut conn = ScriptedConnection::new(&trace, ConnectionState::Closed);
        {
            let mut scope = ConnectionScope::enter(&mut conn).unwrap();
            assert!(scope.opened_here());
            assert!(scope.connection().state().is_open());
            scope.exit().unwrap();
        }
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(trace.calls(), vec![Call::Open, Call::Close]);
    }

    #[test]
    fn test_scope_leaves_open_connection_open() {
        let trace = Trace::default();
        let mut conn = ScriptedConnection::new(&trace, ConnectionState::Open);
        {
            let scope = ConnectionScope::enter(&mut conn).unwrap();
            assert_eq!(scope.entry_state(), ConnectionState::Open);
        }
        assert_eq!(conn.state(), ConnectionState::Open);
        assert!(trace.calls().is_empty());
    }

    #[test]
    fn test_dropped_scope_still_restores() {
        let trace = Trace::default();
        let mut conn = ScriptedConnection::new(&trace, ConnectionState::Closed);
        {
            let _scope = ConnectionScope::enter(&mut conn).unwrap();
        }
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(trace.closes(), 1);
    }

    #[test]
    fn test_open_failure_is_returned() {
        let trace = Trace::default();
        let mut conn = ScriptedConnection::new(&trace, ConnectionState::Closed).failing_open();
        assert!(ConnectionScope::enter(&mut conn).is_err());
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_open_for_cursor_behavior() {
        let trace = Trace::default();
        let mut closed = ScriptedConnection::new(&trace, ConnectionState::Closed);
        assert_eq!(
            open_for_cursor(&mut closed).unwrap(),
            CursorBehavior::CloseConnection
        );
        assert!(closed.state().is_open());

        let mut open = ScriptedConnection::new(&trace, ConnectionState::Open);
        assert_eq!(open_for_cursor(&mut open).unwrap(), CursorBehavior::Default);
    }
}
