//! Bank accounts and their validation attempts.

use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::schema::{AccountRow, ValidationRow};
use chrono::Utc;
use customers_core::{
    hash_account_number, mask_account_number, new_id, Account, AccountStatus, CreateAccountRequest,
    Validation, ValidationStatus,
};
use customers_secrets::{seal, SecretKeeper};
use sqlx::SqlitePool;
use zeroize::Zeroize;

const ACCOUNT_COLUMNS: &str = "account_id, customer_id, user_id, masked_account_number, routing_number, \
     holder_name, holder_type, account_type, status, created_at, last_modified";

/// Repository for the `accounts` table
pub struct AccountRepo;

impl AccountRepo {
    /// Store a new account. The raw number is encrypted, hashed and masked,
    /// then zeroized in `request`.
    pub async fn create(
        pool: &SqlitePool,
        keeper: &dyn SecretKeeper,
        customer_id: &str,
        user_id: &str,
        request: &mut CreateAccountRequest,
    ) -> PersistenceResult<Account> {
        let mut number = request.account_number.trim().to_string();
        request.account_number.zeroize();

        let hashed = hash_account_number(&number);
        let masked = mask_account_number(&number);
        let encrypted = seal(keeper, &mut number)
            .await
            .map_err(|e| PersistenceError::keeper("encryptAccountNumber", e))?;

        let now = Utc::now();
        let account = Account {
            account_id: new_id(),
            customer_id: customer_id.to_string(),
            user_id: user_id.to_string(),
            masked_account_number: masked,
            routing_number: request.routing_number.trim().to_string(),
            holder_name: request.holder_name.trim().to_string(),
            holder_type: request.holder_type,
            account_type: request.account_type,
            status: AccountStatus::None,
            created_at: now,
            last_modified: now,
        };

        sqlx::query(
            r#"
            INSERT INTO accounts (
                account_id, customer_id, user_id, encrypted_account_number,
                hashed_account_number, masked_account_number, routing_number, holder_name,
                holder_type, account_type, status, created_at, last_modified
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.account_id)
        .bind(&account.customer_id)
        .bind(&account.user_id)
        .bind(&encrypted)
        .bind(&hashed)
        .bind(&account.masked_account_number)
        .bind(&account.routing_number)
        .bind(&account.holder_name)
        .bind(account.holder_type.as_str())
        .bind(account.account_type.as_str())
        .bind(account.status.as_str())
        .bind(account.created_at)
        .bind(account.last_modified)
        .execute(pool)
        .await
        .map_err(|e| PersistenceError::from_write(e, "account number already exists for customer"))?;

        Ok(account)
    }

    /// Active accounts of a customer, oldest first.
    pub async fn list_by_customer(pool: &SqlitePool, customer_id: &str) -> PersistenceResult<Vec<Account>> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE customer_id = ? AND deleted_at IS NULL ORDER BY created_at, rowid",
            ACCOUNT_COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(Account::try_from).collect()
    }

    pub async fn get_by_id(pool: &SqlitePool, account_id: &str) -> PersistenceResult<Account> {
        sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE account_id = ? AND deleted_at IS NULL",
            ACCOUNT_COLUMNS
        ))
        .bind(account_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| PersistenceError::not_found("Account", account_id))
        .and_then(Account::try_from)
    }

    /// Account scoped to its customer.
    pub async fn get_for_customer(
        pool: &SqlitePool,
        customer_id: &str,
        account_id: &str,
    ) -> PersistenceResult<Account> {
        let account = Self::get_by_id(pool, account_id).await?;
        if account.customer_id != customer_id {
            return Err(PersistenceError::not_found("Account", account_id));
        }
        Ok(account)
    }

    /// Active accounts among `account_ids`, in the order requested. Unknown
    /// ids are skipped.
    pub async fn get_by_ids(pool: &SqlitePool, account_ids: &[String]) -> PersistenceResult<Vec<Account>> {
        let mut accounts = Vec::with_capacity(account_ids.len());
        for account_id in account_ids {
            match Self::get_by_id(pool, account_id).await {
                Ok(account) => accounts.push(account),
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(accounts)
    }

    /// Soft delete. Idempotent for an existing account.
    pub async fn deactivate(pool: &SqlitePool, customer_id: &str, account_id: &str) -> PersistenceResult<()> {
        let result = sqlx::query(
            "UPDATE accounts SET deleted_at = COALESCE(deleted_at, ?) WHERE customer_id = ? AND account_id = ?",
        )
        .bind(Utc::now())
        .bind(customer_id)
        .bind(account_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Account", account_id));
        }
        Ok(())
    }

    /// Stored base64 ciphertext of the account number.
    pub async fn encrypted_account_number(
        pool: &SqlitePool,
        customer_id: &str,
        account_id: &str,
    ) -> PersistenceResult<String> {
        sqlx::query_scalar::<_, String>(
            "SELECT encrypted_account_number FROM accounts WHERE customer_id = ? AND account_id = ? AND deleted_at IS NULL",
        )
        .bind(customer_id)
        .bind(account_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| PersistenceError::not_found("Account", account_id))
    }

    /// Move the account to `status`. A validated account never goes back to
    /// `none` through this path.
    pub async fn update_status(
        pool: &SqlitePool,
        account_id: &str,
        status: AccountStatus,
    ) -> PersistenceResult<Account> {
        let current = Self::get_by_id(pool, account_id).await?;
        current.status.check_transition(status)?;
        Self::write_status(pool, account_id, status).await
    }

    /// Administrative status change without the transition check.
    pub async fn override_status(
        pool: &SqlitePool,
        account_id: &str,
        status: AccountStatus,
    ) -> PersistenceResult<Account> {
        let account = Self::write_status(pool, account_id, status).await?;
        tracing::warn!(account_id, status = %status, "account status overridden");
        Ok(account)
    }

    async fn write_status(
        pool: &SqlitePool,
        account_id: &str,
        status: AccountStatus,
    ) -> PersistenceResult<Account> {
        let result = sqlx::query(
            "UPDATE accounts SET status = ?, last_modified = ? WHERE account_id = ? AND deleted_at IS NULL",
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(account_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Account", account_id));
        }
        Self::get_by_id(pool, account_id).await
    }
}

/// Repository for the `validations` table
pub struct ValidationRepo;

impl ValidationRepo {
    /// Insert a new `init` validation. A second open validation for the same
    /// account is a unique violation.
    pub async fn create(pool: &SqlitePool, validation: &Validation) -> PersistenceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO validations (
                validation_id, account_id, status, strategy, vendor, vendor_response,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&validation.validation_id)
        .bind(&validation.account_id)
        .bind(validation.status.as_str())
        .bind(&validation.strategy)
        .bind(&validation.vendor)
        .bind(serde_json::to_string(&validation.vendor_response)?)
        .bind(validation.created_at)
        .bind(validation.updated_at)
        .execute(pool)
        .await
        .map_err(|e| PersistenceError::from_write(e, "account already has an open validation"))?;
        Ok(())
    }

    pub async fn get(
        pool: &SqlitePool,
        account_id: &str,
        validation_id: &str,
    ) -> PersistenceResult<Validation> {
        sqlx::query_as::<_, ValidationRow>(
            "SELECT * FROM validations WHERE account_id = ? AND validation_id = ?",
        )
        .bind(account_id)
        .bind(validation_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| PersistenceError::not_found("Validation", validation_id))
        .and_then(Validation::try_from)
    }

    /// The account's validation still in `init`, if any.
    pub async fn open_for_account(pool: &SqlitePool, account_id: &str) -> PersistenceResult<Option<Validation>> {
        sqlx::query_as::<_, ValidationRow>(
            "SELECT * FROM validations WHERE account_id = ? AND status = 'init'",
        )
        .bind(account_id)
        .fetch_optional(pool)
        .await?
        .map(Validation::try_from)
        .transpose()
    }

    /// All validations of an account, oldest first.
    pub async fn list(pool: &SqlitePool, account_id: &str) -> PersistenceResult<Vec<Validation>> {
        let rows = sqlx::query_as::<_, ValidationRow>(
            "SELECT * FROM validations WHERE account_id = ? ORDER BY created_at, rowid",
        )
        .bind(account_id)
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(Validation::try_from).collect()
    }

    /// Mark the validation completed and, when `validate_account` is set,
    /// the account validated, in one transaction.
    pub async fn complete(
        pool: &SqlitePool,
        account_id: &str,
        validation_id: &str,
        vendor_response: &serde_json::Value,
        validate_account: bool,
    ) -> PersistenceResult<Validation> {
        let now = Utc::now();
        let mut tx = pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE validations SET status = ?, vendor_response = ?, updated_at = ?
            WHERE account_id = ? AND validation_id = ? AND status = 'init'
            "#,
        )
        .bind(ValidationStatus::Completed.as_str())
        .bind(serde_json::to_string(vendor_response)?)
        .bind(now)
        .bind(account_id)
        .bind(validation_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Validation", validation_id));
        }

        if validate_account {
            let result = sqlx::query(
                "UPDATE accounts SET status = ?, last_modified = ? WHERE account_id = ? AND deleted_at IS NULL",
            )
            .bind(AccountStatus::Validated.as_str())
            .bind(now)
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(PersistenceError::not_found("Account", account_id));
            }
        }

        tx.commit().await.map_err(PersistenceError::commit)?;
        Self::get(pool, account_id, validation_id).await
    }
}
