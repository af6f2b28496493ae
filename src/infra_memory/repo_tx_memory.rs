use crate::domain_port::{StorageTx, TxManager};
use std::any::Any;

/// Transactions without isolation. Every write lands immediately and
/// `rollback` undoes nothing.
#[derive(Debug, Default)]
pub struct MemoryTxManager;

#[async_trait::async_trait]
impl TxManager for MemoryTxManager {
    async fn begin(&self) -> anyhow::Result<Box<dyn StorageTx>> {
        Ok(Box::new(MemoryTx))
    }
}

#[derive(Debug)]
pub struct MemoryTx;

#[async_trait::async_trait]
impl StorageTx for MemoryTx {
    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
