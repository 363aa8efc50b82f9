//! Shared fixtures for repository tests.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use chairside_core::{DiscountType, Money, Package, Percent, Role, User};

use crate::pool::{Database, DbConfig};
use crate::repository::discount::NewDiscountCode;

pub(crate) async fn setup() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

/// A database file in the temp dir, removed with its WAL files on drop.
pub(crate) struct TempDbFile {
    pub path: PathBuf,
}

impl Drop for TempDbFile {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut path = self.path.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(path);
        }
    }
}

/// A file-backed database with a real connection pool.
pub(crate) async fn setup_on_disk(tag: &str, max_connections: u32) -> (Database, TempDbFile) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let file = TempDbFile {
        path: std::env::temp_dir().join(format!(
            "chairside-{}-{}-{}.db",
            tag,
            std::process::id(),
            nanos
        )),
    };
    let db = Database::new(DbConfig::new(file.path.clone()).max_connections(max_connections))
        .await
        .expect("file database");
    (db, file)
}

/// A small shop: one boss, one staff member, one client, a RM50 haircut and
/// a RM30 beard trim.
pub(crate) struct Shop {
    pub db: Database,
    pub boss: User,
    pub staff: User,
    pub client_id: i64,
    pub haircut: Package,
    pub beard: Package,
}

impl Shop {
    pub async fn open() -> Shop {
        Shop::seed(setup().await).await
    }

    pub async fn seed(db: Database) -> Shop {
        let boss = db.users().create("Boss", Role::Boss, None, None).await.unwrap();
        let staff = db.users().create("Amir", Role::Staff, None, None).await.unwrap();
        let client = db.clients().create("Farah", Some("012-3456789")).await.unwrap();
        let haircut = db
            .packages()
            .create("Haircut", Money::from_cents(5000), 45)
            .await
            .unwrap();
        let beard = db
            .packages()
            .create("Beard Trim", Money::from_cents(3000), 20)
            .await
            .unwrap();

        Shop {
            db,
            boss,
            staff,
            client_id: client.id,
            haircut,
            beard,
        }
    }

    pub async fn percent_code(&self, code: &str, percent: u32, applicable: Vec<i64>) -> i64 {
        self.db
            .discount_codes()
            .create(NewDiscountCode {
                code: code.to_string(),
                discount_type: DiscountType::Percentage,
                percent: Some(Percent::from_bps(percent * 100)),
                amount: None,
                applicable_packages: applicable,
            })
            .await
            .unwrap()
            .id
    }
}
