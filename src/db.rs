use sqlx::SqlitePool;

use crate::{
    errors::AppError,
    items::{self, ItemEntry},
    structs::{Receipt, ReceiptSummary, User},
    utils,
};

pub async fn find_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Registers a new user. The plaintext password is hashed here; a duplicate
/// username surfaces as the recoverable [`AppError::UsernameTaken`].
pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<User, AppError> {
    let pwd_hash = utils::hash_password(password).map_err(|e| {
        log::error!("Failed to hash password: {}", e);
        AppError::PasswordError(e.to_string())
    })?;
    let created_at = chrono::Utc::now().to_string();

    let result = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, pwd_hash, created_at) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(username)
    .bind(&pwd_hash)
    .bind(&created_at)
    .fetch_one(pool)
    .await;

    match result {
        Ok(user) => {
            log::info!("User created: {} (id {})", user.username, user.id);
            Ok(user)
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(AppError::UsernameTaken)
        }
        Err(e) => Err(AppError::DatabaseError(e)),
    }
}

/// Persists a receipt. The stored total is recomputed from the entries, never
/// taken from client input.
pub async fn create_receipt(
    pool: &SqlitePool,
    user_id: i64,
    client_name: &str,
    entries: &[ItemEntry],
    created_at: &str,
) -> Result<i64, AppError> {
    let normalized = items::normalize(entries);
    let items_json = serde_json::to_string(entries)?;
    let total = normalized.display_total();

    let result = sqlx::query(
        "INSERT INTO receipts (user_id, client_name, items, created_at, total) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(client_name)
    .bind(&items_json)
    .bind(created_at)
    .bind(&total)
    .execute(pool)
    .await?;

    let receipt_id = result.last_insert_rowid();
    log::info!("Receipt {} created for user {}", receipt_id, user_id);
    Ok(receipt_id)
}

/// Owner-filtered lookup. A receipt belonging to another user is
/// indistinguishable from a missing one.
pub async fn get_receipt(
    pool: &SqlitePool,
    receipt_id: i64,
    user_id: i64,
) -> Result<Option<Receipt>, sqlx::Error> {
    let receipt =
        sqlx::query_as::<_, Receipt>("SELECT * FROM receipts WHERE id = $1 AND user_id = $2")
            .bind(receipt_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(receipt)
}

pub async fn list_recent_receipts(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<ReceiptSummary>, sqlx::Error> {
    let receipts = sqlx::query_as::<_, ReceiptSummary>(
        "SELECT id, client_name, created_at, total FROM receipts \
         WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(receipts)
}

pub async fn list_receipts(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<ReceiptSummary>, sqlx::Error> {
    let receipts = sqlx::query_as::<_, ReceiptSummary>(
        "SELECT id, client_name, created_at, total FROM receipts \
         WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(receipts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!().run(&pool).await.unwrap();
        pool
    }

    fn entry(name: &str, quantity: Option<&str>, price: &str) -> ItemEntry {
        ItemEntry {
            name: name.to_owned(),
            quantity: quantity.map(str::to_owned),
            price: price.to_owned(),
        }
    }

    #[tokio::test]
    async fn receipt_round_trip_stores_derived_total() {
        let pool = test_pool().await;
        let user = create_user(&pool, "alice", "pw-alice-123!").await.unwrap();

        let entries = vec![
            entry("Widget", Some("3"), "10"),
            entry("Gadget", None, "7.5"),
        ];
        let id = create_receipt(&pool, user.id, "ACME", &entries, "2026-08-23 12:00")
            .await
            .unwrap();

        let receipt = get_receipt(&pool, id, user.id).await.unwrap().unwrap();
        assert_eq!(receipt.client_name, "ACME");
        assert_eq!(receipt.total, "37.50");
        assert_eq!(receipt.entries(), entries);
    }

    #[tokio::test]
    async fn other_users_receipt_reads_as_not_found() {
        let pool = test_pool().await;
        let alice = create_user(&pool, "alice", "pw-alice-123!").await.unwrap();
        let bob = create_user(&pool, "bob", "pw-bob-12345!").await.unwrap();

        let entries = vec![entry("Widget", None, "5")];
        let id = create_receipt(&pool, alice.id, "ACME", &entries, "2026-08-23 12:00")
            .await
            .unwrap();

        assert!(get_receipt(&pool, id, bob.id).await.unwrap().is_none());
        assert!(get_receipt(&pool, id, alice.id).await.unwrap().is_some());
        assert!(get_receipt(&pool, id + 1, alice.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_is_recoverable_and_keeps_first_credential() {
        let pool = test_pool().await;
        let first = create_user(&pool, "alice", "first-password1!").await.unwrap();

        let second = create_user(&pool, "alice", "second-password2!").await;
        assert!(matches!(second, Err(AppError::UsernameTaken)));

        let stored = find_user_by_username(&pool, "alice").await.unwrap().unwrap();
        assert_eq!(stored.pwd_hash, first.pwd_hash);
        assert!(utils::verify_password("first-password1!", &stored.pwd_hash));
    }

    #[tokio::test]
    async fn list_recent_honors_limit_and_order() {
        let pool = test_pool().await;
        let user = create_user(&pool, "alice", "pw-alice-123!").await.unwrap();

        let entries = vec![entry("Widget", None, "1")];
        for day in 1..=4 {
            let stamp = format!("2026-08-{:02} 09:00", day);
            create_receipt(&pool, user.id, &format!("client-{}", day), &entries, &stamp)
                .await
                .unwrap();
        }

        let recent = list_recent_receipts(&pool, user.id, 3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].client_name, "client-4");
        assert_eq!(recent[1].client_name, "client-3");
        assert_eq!(recent[2].client_name, "client-2");

        let all = list_receipts(&pool, user.id).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[3].client_name, "client-1");
    }

    #[tokio::test]
    async fn listings_are_scoped_to_the_owner() {
        let pool = test_pool().await;
        let alice = create_user(&pool, "alice", "pw-alice-123!").await.unwrap();
        let bob = create_user(&pool, "bob", "pw-bob-12345!").await.unwrap();

        let entries = vec![entry("Widget", None, "5")];
        create_receipt(&pool, alice.id, "ACME", &entries, "2026-08-23 12:00")
            .await
            .unwrap();

        assert!(list_receipts(&pool, bob.id).await.unwrap().is_empty());
        assert_eq!(list_receipts(&pool, alice.id).await.unwrap().len(), 1);
    }
}
