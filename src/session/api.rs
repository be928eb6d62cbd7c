//! Session-facing capability interface.
//!
//! Code that only needs to run statements can be written against
//! [`DbSession`] and take a [`ScopedSession`] to guarantee the connection is
//! closed on every exit path, including early returns and panics.

use std::ops::{Deref, DerefMut};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::session::{Credentials, ExecOutcome, QueryResult, Session, Version};
use crate::transport::Endpoint;

/// Operations every session flavour offers.
pub trait DbSession {
    fn connect(endpoint: Endpoint, credentials: &Credentials, config: ClientConfig) -> Result<Self>
    where
        Self: Sized;

    fn query(&mut self, sql: &str, buffered: bool) -> Result<QueryResult<'_>>;

    fn execute(&mut self, sql: &str) -> Result<ExecOutcome>;

    /// Idempotent.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    fn server_version(&self) -> Option<&Version>;

    fn cipher(&self) -> Option<&str>;
}

impl DbSession for Session {
    fn connect(endpoint: Endpoint, credentials: &Credentials, config: ClientConfig) -> Result<Self> {
        Session::connect(endpoint, credentials, config)
    }

    fn query(&mut self, sql: &str, buffered: bool) -> Result<QueryResult<'_>> {
        Session::query(self, sql, buffered)
    }

    fn execute(&mut self, sql: &str) -> Result<ExecOutcome> {
        Session::execute(self, sql)
    }

    fn close(&mut self) {
        Session::close(self)
    }

    fn is_open(&self) -> bool {
        Session::is_open(self)
    }

    fn server_version(&self) -> Option<&Version> {
        Session::server_version(self)
    }

    fn cipher(&self) -> Option<&str> {
        Session::cipher(self)
    }
}

/// Borrows a session and closes it when dropped.
pub struct ScopedSession<'a, S: DbSession> {
    session: &'a mut S,
}

impl<'a, S: DbSession> ScopedSession<'a, S> {
    pub fn new(session: &'a mut S) -> Self {
        Self { session }
    }
}

impl<S: DbSession> Deref for ScopedSession<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.session
    }
}

impl<S: DbSession> DerefMut for ScopedSession<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.session
    }
}

impl<S: DbSession> Drop for ScopedSession<'_, S> {
    fn drop(&mut self) {
        self.session.close();
    }
}
