use super::models::{CarRow, PolicyRow};
use super::DbPool;
use crate::models::Policy;
use async_trait::async_trait;

/// Durable copy of the download bookkeeping, keyed by
/// `(company, policy_number)` and `(company, policy_number, license_plate)`.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn get_policy_with_cars(
        &self,
        company: &str,
        policy_number: &str,
    ) -> Result<Option<Policy>, sqlx::Error>;

    async fn save_policy(&self, policy: &Policy) -> Result<(), sqlx::Error>;
}

#[derive(Clone)]
pub struct SqlitePolicyStore {
    pool: DbPool,
}

impl SqlitePolicyStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PolicyStore for SqlitePolicyStore {
    async fn get_policy_with_cars(
        &self,
        company: &str,
        policy_number: &str,
    ) -> Result<Option<Policy>, sqlx::Error> {
        let row = sqlx::query_as::<_, PolicyRow>(
            "SELECT * FROM policy WHERE company = ? AND policy_number = ?",
        )
        .bind(company)
        .bind(policy_number)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let cars = sqlx::query_as::<_, CarRow>(
            "SELECT * FROM car WHERE company = ? AND policy_number = ? ORDER BY license_plate",
        )
        .bind(company)
        .bind(policy_number)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(row.into_policy(cars)))
    }

    async fn save_policy(&self, policy: &Policy) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO policy (company, policy_number, year, expiration_date, downloaded,
                                cancelled, contains_cars, soa_only, obs, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT (company, policy_number) DO UPDATE SET
                year = excluded.year,
                expiration_date = excluded.expiration_date,
                downloaded = excluded.downloaded,
                cancelled = excluded.cancelled,
                contains_cars = excluded.contains_cars,
                soa_only = excluded.soa_only,
                obs = excluded.obs,
                timestamp = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&policy.company)
        .bind(&policy.number)
        .bind(policy.year)
        .bind(policy.expiration_date)
        .bind(policy.downloaded)
        .bind(policy.cancelled)
        .bind(policy.contains_cars)
        .bind(policy.soa_only)
        .bind(&policy.obs)
        .execute(&mut *tx)
        .await?;

        for vehicle in &policy.vehicles {
            sqlx::query(
                r#"
                INSERT INTO car (company, policy_number, license_plate, brand, model, year,
                                 soa_file_path, mercosur_file_path, timestamp)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
                ON CONFLICT (company, policy_number, license_plate) DO UPDATE SET
                    brand = excluded.brand,
                    model = excluded.model,
                    year = excluded.year,
                    soa_file_path = excluded.soa_file_path,
                    mercosur_file_path = excluded.mercosur_file_path,
                    timestamp = CURRENT_TIMESTAMP
                "#,
            )
            .bind(&policy.company)
            .bind(&policy.number)
            .bind(vehicle.license_plate.trim())
            .bind(&vehicle.brand)
            .bind(&vehicle.model)
            .bind(vehicle.year)
            .bind(vehicle.soa.as_ref().map(|p| p.to_string_lossy().into_owned()))
            .bind(vehicle.mercosur.as_ref().map(|p| p.to_string_lossy().into_owned()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(
            "💾 Póliza {} de {} guardada ({} vehículos)",
            policy.number,
            policy.company,
            policy.vehicles.len()
        );
        Ok(())
    }
}
