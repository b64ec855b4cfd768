// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution context for one in-flight statement
//!
//! The context owns the sending half of the result sink and observes a
//! cancellation signal. The sink is a bounded channel, so a slow consumer
//! suspends the producer in [`ExecutionContext::send`].

use super::auth::{CoarseAuthorizer, FineAuthorizer, OpenAuthorizer};
use super::error::ExecutionError;
use super::result::QueryResult;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Why an execution was interrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    QueryKilled,
    QueryTimeout,
    ClientClosed,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CancelReason::QueryKilled => f.write_str("query killed"),
            CancelReason::QueryTimeout => f.write_str("query timeout"),
            CancelReason::ClientClosed => f.write_str("client closed connection"),
        }
    }
}

/// Handle used to interrupt an execution
#[derive(Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<Option<CancelReason>>>,
}

impl CancelHandle {
    pub fn new() -> (Self, watch::Receiver<Option<CancelReason>>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx: Arc::new(tx) }, rx)
    }

    /// Signal cancellation; the first reason wins
    pub fn cancel(&self, reason: CancelReason) {
        self.tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason);
                true
            } else {
                false
            }
        });
    }

    pub fn reason(&self) -> Option<CancelReason> {
        *self.tx.borrow()
    }

    /// New receiver observing this handle
    pub fn subscribe(&self) -> watch::Receiver<Option<CancelReason>> {
        self.tx.subscribe()
    }
}

pub struct ExecutionContext {
    results: mpsc::Sender<QueryResult>,
    cancel: watch::Receiver<Option<CancelReason>>,
    pub authorizer: Arc<dyn FineAuthorizer>,
    pub coarse_authorizer: Arc<dyn CoarseAuthorizer>,
    pub read_only: bool,
    /// Maximum tuples per emitted row; 0 means unlimited
    pub chunk_size: usize,
    /// Default database of the session
    pub database: String,
    pub node_id: u64,
    pub statement_id: usize,
}

impl ExecutionContext {
    /// Create a context sending into `results` and observing `cancel`
    ///
    /// Authorization defaults to open.
    pub fn new(
        results: mpsc::Sender<QueryResult>,
        cancel: watch::Receiver<Option<CancelReason>>,
    ) -> Self {
        Self {
            results,
            cancel,
            authorizer: Arc::new(OpenAuthorizer),
            coarse_authorizer: Arc::new(OpenAuthorizer),
            read_only: false,
            chunk_size: 0,
            database: String::new(),
            node_id: 0,
            statement_id: 0,
        }
    }

    /// Context plus the receiving half of its sink and its cancel handle
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<QueryResult>, CancelHandle) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let (handle, cancel) = CancelHandle::new();
        (Self::new(tx, cancel), rx, handle)
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn FineAuthorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn with_coarse_authorizer(mut self, authorizer: Arc<dyn CoarseAuthorizer>) -> Self {
        self.coarse_authorizer = authorizer;
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_node_id(mut self, node_id: u64) -> Self {
        self.node_id = node_id;
        self
    }

    pub fn with_statement_id(mut self, statement_id: usize) -> Self {
        self.statement_id = statement_id;
        self
    }

    /// Cancellation reason, if the execution has been interrupted
    pub fn cancelled(&self) -> Option<CancelReason> {
        *self.cancel.borrow()
    }

    /// Fail with the cancellation reason if one has been signalled
    pub fn check_cancelled(&self) -> Result<(), ExecutionError> {
        match self.cancelled() {
            Some(reason) => Err(ExecutionError::Cancelled(reason)),
            None => Ok(()),
        }
    }

    /// Deliver a result, waiting for sink capacity
    ///
    /// Fails with [`ExecutionError::QueryAborted`] once the receiver is gone,
    /// or with the cancellation reason if interrupted while waiting.
    pub async fn send(&self, mut result: QueryResult) -> Result<(), ExecutionError> {
        result.statement_id = self.statement_id;
        let mut cancel = self.cancel.clone();
        // Cancellation wins over a sink that still has room.
        tokio::select! {
            biased;
            reason = wait_cancelled(&mut cancel) => Err(ExecutionError::Cancelled(reason)),
            sent = self.results.send(result) => sent.map_err(|_| ExecutionError::QueryAborted),
        }
    }
}

async fn wait_cancelled(cancel: &mut watch::Receiver<Option<CancelReason>>) -> CancelReason {
    let reason = match cancel.wait_for(Option::is_some).await {
        Ok(reason) => *reason,
        Err(_) => None,
    };
    match reason {
        Some(reason) => reason,
        // Handle dropped without cancelling: never resolves.
        None => std::future::pending().await,
    }
}
