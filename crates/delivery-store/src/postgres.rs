use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgPoolOptions, postgres::PgRow};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    DatabaseConfig, Delivery, DeliveryEvent, DeliveryId, DeliveryPage, DeliveryStatus, EventId,
    ListQuery, Result, ShippingAddress, TrackedDelivery, TrackingNumber, UpdateDelivery,
    store::DeliveryStore,
};

const SELECT_DELIVERY: &str = r#"
    SELECT d.id, d.order_id, d.courier_id, d.status, d.tracking_number,
           d.estimated_delivery_time, d.actual_delivery_time, d.created_at, d.updated_at,
           a.street, a.city, a.state, a.country, a.zip_code
    FROM deliveries d
    JOIN delivery_addresses a ON a.delivery_id = d.id
"#;

const SELECT_EVENTS: &str = r#"
    SELECT id, delivery_id, status, location, description, timestamp
    FROM delivery_events
    WHERE delivery_id = $1
    ORDER BY timestamp ASC, seq ASC
"#;

/// PostgreSQL-backed delivery store.
///
/// Every multi-record write runs inside a single sqlx transaction. A
/// transaction that is dropped before `commit` (an error, a timeout, or a
/// cancelled future) is rolled back by sqlx.
#[derive(Clone)]
pub struct PostgresDeliveryStore {
    pool: PgPool,
}

impl PostgresDeliveryStore {
    /// Creates a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool and verifies the database is reachable.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(config.connect_options()?)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;
        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "connected to delivery store"
        );

        Ok(Self { pool })
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Closes every pooled connection. Waits for checked-out connections.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("delivery store closed");
    }

    fn row_to_delivery(row: &PgRow) -> Result<Delivery> {
        let text = |column: &str| -> Result<String> {
            Ok(row.try_get::<Option<String>, _>(column)?.unwrap_or_default())
        };

        Ok(Delivery {
            id: DeliveryId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: row.try_get("order_id")?,
            shipping_address: ShippingAddress {
                street: text("street")?,
                city: text("city")?,
                state: text("state")?,
                country: text("country")?,
                zip_code: text("zip_code")?,
            },
            courier_id: row.try_get("courier_id")?,
            status: DeliveryStatus::from(row.try_get::<String, _>("status")?),
            tracking_number: TrackingNumber::from(row.try_get::<String, _>("tracking_number")?),
            estimated_delivery_time: row.try_get("estimated_delivery_time")?,
            actual_delivery_time: row.try_get("actual_delivery_time")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_event(row: &PgRow) -> Result<DeliveryEvent> {
        Ok(DeliveryEvent {
            id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            delivery_id: DeliveryId::from_uuid(row.try_get::<Uuid, _>("delivery_id")?),
            status: DeliveryStatus::from(row.try_get::<String, _>("status")?),
            location: row.try_get("location")?,
            description: row.try_get("description")?,
            timestamp: row.try_get("timestamp")?,
        })
    }

    async fn insert_event<'c, E>(executor: E, event: &DeliveryEvent) -> Result<()>
    where
        E: sqlx::PgExecutor<'c>,
    {
        sqlx::query(
            r#"
            INSERT INTO delivery_events (id, delivery_id, status, location, description, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.delivery_id.as_uuid())
        .bind(event.status.as_str())
        .bind(&event.location)
        .bind(&event.description)
        .bind(event.timestamp)
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DeliveryStore for PostgresDeliveryStore {
    #[tracing::instrument(skip(self, shipping_address))]
    async fn create_delivery(
        &self,
        order_id: &str,
        shipping_address: &ShippingAddress,
    ) -> Result<Delivery> {
        let (delivery, event) =
            Delivery::new_pending(order_id, shipping_address.clone(), common::now());

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO deliveries (
                id, order_id, courier_id, status, tracking_number,
                estimated_delivery_time, actual_delivery_time, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(delivery.id.as_uuid())
        .bind(&delivery.order_id)
        .bind(delivery.courier_id.as_deref())
        .bind(delivery.status.as_str())
        .bind(delivery.tracking_number.as_str())
        .bind(delivery.estimated_delivery_time)
        .bind(delivery.actual_delivery_time)
        .bind(delivery.created_at)
        .bind(delivery.updated_at)
        .execute(&mut *tx)
        .await?;

        let address = &delivery.shipping_address;
        sqlx::query(
            r#"
            INSERT INTO delivery_addresses (delivery_id, street, city, state, country, zip_code)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(delivery.id.as_uuid())
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.country)
        .bind(&address.zip_code)
        .execute(&mut *tx)
        .await?;

        Self::insert_event(&mut *tx, &event).await?;

        tx.commit().await?;
        debug!(
            delivery_id = %delivery.id,
            tracking_number = %delivery.tracking_number,
            "delivery created"
        );
        Ok(delivery)
    }

    #[tracing::instrument(skip(self))]
    async fn get_delivery(&self, id: DeliveryId) -> Result<Option<Delivery>> {
        let sql = format!("{SELECT_DELIVERY} WHERE d.id = $1");
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_delivery).transpose()
    }

    #[tracing::instrument(skip(self), fields(delivery_id = %update.id, status = %update.status))]
    async fn update_delivery(&self, update: &UpdateDelivery) -> Result<Option<Delivery>> {
        let now = common::now();
        let mut tx = self.pool.begin().await?;

        // The UPDATE takes the row lock that serializes concurrent updates of
        // the same delivery until commit.
        let updated: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE deliveries
            SET status = $2,
                updated_at = $3,
                actual_delivery_time = CASE WHEN $4 THEN $3 ELSE actual_delivery_time END
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(update.id.as_uuid())
        .bind(update.status.as_str())
        .bind(now)
        .bind(update.status.is_terminal())
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            tx.rollback().await?;
            debug!("no delivery matched the update");
            return Ok(None);
        }

        Self::insert_event(&mut *tx, &update.to_event(now)).await?;

        tx.commit().await?;
        self.get_delivery(update.id).await
    }

    #[tracing::instrument(skip(self))]
    async fn list_deliveries(&self, query: &ListQuery) -> Result<DeliveryPage> {
        // Count and page read from one snapshot so `total` matches the rows.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM deliveries WHERE ($1::text IS NULL OR order_id = $1)",
        )
        .bind(query.order_id.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        if total == 0 {
            tx.commit().await?;
            return Ok(DeliveryPage::empty());
        }

        let sql = format!(
            "{SELECT_DELIVERY} WHERE ($1::text IS NULL OR d.order_id = $1) \
             ORDER BY d.created_at DESC, d.id ASC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(query.order_id.as_deref())
            .bind(i64::try_from(query.limit()).unwrap_or(i64::MAX))
            .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        let deliveries = rows
            .iter()
            .map(Self::row_to_delivery)
            .collect::<Result<Vec<_>>>()?;

        Ok(DeliveryPage {
            deliveries,
            total: total.unsigned_abs(),
        })
    }

    #[tracing::instrument(skip(self))]
    async fn track_delivery(
        &self,
        tracking_number: &TrackingNumber,
    ) -> Result<Option<TrackedDelivery>> {
        let sql = format!("{SELECT_DELIVERY} WHERE d.tracking_number = $1");
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(tracking_number.as_str())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let delivery = Self::row_to_delivery(&row)?;
        let events = self.events_for_delivery(delivery.id).await?;

        Ok(Some(TrackedDelivery { delivery, events }))
    }

    #[tracing::instrument(skip(self))]
    async fn events_for_delivery(&self, id: DeliveryId) -> Result<Vec<DeliveryEvent>> {
        let rows = sqlx::query(SELECT_EVENTS)
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_event).collect()
    }
}
