use super::repo_tx_mysql::MySqlTx;
use crate::application_port::AuthError;
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::mysql::MySqlDatabaseError;
use uuid::Uuid;

pub fn downcast(tx: &mut dyn StorageTx) -> Result<&mut MySqlTx, AuthError> {
    tx.as_any_mut()
        .downcast_mut::<MySqlTx>()
        .ok_or_else(|| AuthError::Internal("storage transaction is not a MySQL transaction".into()))
}

pub fn is_dup_key(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db) = err {
        if let Some(mysql_err) = db.try_downcast_ref::<MySqlDatabaseError>() {
            return mysql_err.number() == 1062; // ER_DUP_ENTRY
        }
    }

    false
}

pub fn store_err(e: sqlx::Error) -> AuthError {
    AuthError::StoreUnavailable(e.to_string())
}

pub fn uuid_from_bytes(bytes: &[u8]) -> Result<Uuid, AuthError> {
    Uuid::from_slice(bytes).map_err(|e| AuthError::Internal(format!("stored uuid: {e}")))
}

pub fn user_id_from_bytes(bytes: &[u8]) -> Result<UserId, AuthError> {
    uuid_from_bytes(bytes).map(UserId)
}
