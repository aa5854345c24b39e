//! Demo accounts and assets for a fresh installation.
//!
//! Rows are matched by their natural keys (email, asset tag): anything that
//! already exists is left untouched, so seeding can run on every start.

use time::{macros::date, Date, OffsetDateTime};

use super::{
    asset::{self, Asset},
    user::{self, PasswordHash, Role, User},
    Error, Store,
};

/// Password every seeded account starts with.
pub const PASSWORD: &str = "password123";

struct SeedUser {
    email: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    role: Role,
    department: &'static str,
}

const USERS: [SeedUser; 3] = [
    SeedUser {
        email: "admin@supportflow.com",
        first_name: "Admin",
        last_name: "User",
        role: Role::Admin,
        department: "IT",
    },
    SeedUser {
        email: "tech@supportflow.com",
        first_name: "Tech",
        last_name: "Support",
        role: Role::Tech,
        department: "IT",
    },
    SeedUser {
        email: "user@supportflow.com",
        first_name: "Regular",
        last_name: "User",
        role: Role::User,
        department: "Sales",
    },
];

struct SeedAsset {
    asset_tag: &'static str,
    brand: &'static str,
    model: &'static str,
    serial_number: &'static str,
    kind: &'static str,
    status: asset::Status,
    purchase_date: Date,
    /// Email of the seeded account holding the asset.
    assigned_to: Option<&'static str>,
}

const ASSETS: [SeedAsset; 3] = [
    SeedAsset {
        asset_tag: "AST-001",
        brand: "Dell",
        model: "XPS 15",
        serial_number: "DXPS15-001",
        kind: "Laptop",
        status: asset::Status::Assigned,
        purchase_date: date!(2023 - 01 - 15),
        assigned_to: Some("user@supportflow.com"),
    },
    SeedAsset {
        asset_tag: "AST-002",
        brand: "LG",
        model: "UltraFine 4K",
        serial_number: "LG4K-002",
        kind: "Monitor",
        status: asset::Status::Assigned,
        purchase_date: date!(2023 - 02 - 20),
        assigned_to: Some("user@supportflow.com"),
    },
    SeedAsset {
        asset_tag: "AST-003",
        brand: "HP",
        model: "LaserJet Pro",
        serial_number: "HPLJ-003",
        kind: "Printer",
        status: asset::Status::InStock,
        purchase_date: date!(2023 - 03 - 10),
        assigned_to: None,
    },
];

const LOCATION: &str = "HQ";

/// Number of rows a [`seed`] run actually inserted.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Seeded {
    pub users: usize,
    pub assets: usize,
}

pub async fn seed(
    db: &dyn Store,
    password_hash: &PasswordHash,
    now: OffsetDateTime,
) -> Result<Seeded, Error> {
    let mut seeded = Seeded::default();

    for account in &USERS {
        if db.get_user_by_email(account.email).await?.is_some() {
            continue;
        }
        let user = User {
            id: user::Id::new(),
            email: account.email.to_owned(),
            first_name: account.first_name.to_owned(),
            last_name: account.last_name.to_owned(),
            password_hash: password_hash.clone(),
            role: account.role,
            department: Some(account.department.to_owned()),
            reset_token: None,
            reset_token_expires_at: None,
            created_at: now,
        };
        match db.insert_user(&user).await {
            Ok(()) => seeded.users += 1,
            Err(Error::Duplicate(_)) => {}
            Err(e) => return Err(e),
        }
    }

    for item in &ASSETS {
        let assigned_to = match item.assigned_to {
            Some(email) => db.get_user_by_email(email).await?.map(|u| u.id),
            None => None,
        };
        let asset = Asset {
            id: asset::Id::new(),
            asset_tag: item.asset_tag.to_owned(),
            serial_number: Some(item.serial_number.to_owned()),
            kind: Some(item.kind.to_owned()),
            brand: Some(item.brand.to_owned()),
            model: Some(item.model.to_owned()),
            status: item.status,
            location: Some(LOCATION.to_owned()),
            purchase_date: Some(item.purchase_date),
            warranty_expiry: None,
            assigned_to,
            created_at: now,
            updated_at: now,
        };
        match db.insert_asset(&asset).await {
            Ok(()) => seeded.assets += 1,
            Err(Error::Duplicate(_)) => {}
            Err(e) => return Err(e),
        }
    }

    Ok(seeded)
}
