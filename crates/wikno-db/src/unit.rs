//! Scoped transactional unit over a Neo4j transaction.

use neo4rs::{Query, Row, Txn};

use wikno_core::error::Result;
use wikno_core::WiknoError;

use crate::error::translate_error;

/// One atomic unit of work.
///
/// `commit` and `rollback` consume the unit. A unit dropped while still open
/// (early `?` return, panic, cancelled task) schedules a rollback on the
/// current runtime; the server would otherwise roll back when the pooled
/// connection's transaction times out.
pub struct Neo4jUnit {
    txn: Option<Txn>,
}

impl Neo4jUnit {
    pub(crate) fn new(txn: Txn) -> Self {
        Self { txn: Some(txn) }
    }

    fn txn(&mut self) -> Result<&mut Txn> {
        self.txn
            .as_mut()
            .ok_or_else(|| WiknoError::internal("transactional unit already finished"))
    }

    /// Execute a write-only statement inside the unit.
    pub async fn run(&mut self, query: Query) -> Result<()> {
        self.txn()?.run(query).await.map_err(translate_error)
    }

    /// Execute a read statement inside the unit and collect all rows.
    pub async fn query_rows(&mut self, query: Query) -> Result<Vec<Row>> {
        let txn = self.txn()?;
        let mut stream = txn.execute(query).await.map_err(translate_error)?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next(txn.handle()).await.map_err(translate_error)? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a read statement inside the unit and return the first row.
    pub async fn query_one(&mut self, query: Query) -> Result<Option<Row>> {
        Ok(self.query_rows(query).await?.into_iter().next())
    }

    pub async fn commit(mut self) -> Result<()> {
        match self.txn.take() {
            Some(txn) => txn.commit().await.map_err(translate_error),
            None => Err(WiknoError::internal("transactional unit already finished")),
        }
    }

    pub async fn rollback(mut self) -> Result<()> {
        match self.txn.take() {
            Some(txn) => txn.rollback().await.map_err(translate_error),
            None => Ok(()),
        }
    }
}

impl Drop for Neo4jUnit {
    fn drop(&mut self) {
        let Some(txn) = self.txn.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = txn.rollback().await {
                        tracing::warn!(error = %e, "Rollback of abandoned unit failed");
                    } else {
                        tracing::debug!("Rolled back abandoned unit");
                    }
                });
            }
            Err(_) => {
                tracing::warn!("Unit dropped outside a runtime; relying on server-side rollback");
            }
        }
    }
}
