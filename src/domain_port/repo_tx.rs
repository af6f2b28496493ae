use std::any::Any;

#[async_trait::async_trait]
pub trait TxManager: Send + Sync {
    async fn begin(&self) -> anyhow::Result<Box<dyn StorageTx>>;
}

#[async_trait::async_trait]
pub trait StorageTx: Send + 'static {
    async fn commit(self: Box<Self>) -> anyhow::Result<()>;
    async fn rollback(self: Box<Self>) -> anyhow::Result<()>;
    /// Lets an adapter recover its own concrete transaction type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
