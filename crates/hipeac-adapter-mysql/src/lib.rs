//! MySQL implementation of [`DirectoryStore`].
//!
//! Every pooled connection is switched to a read-only session right after it
//! is opened, so a write that slips through fails at the server.
//!
//! Member links live in generic relation tables keyed by
//! `(content_type_id, object_id)`; the content type id of member rows is
//! looked up once when the store connects.

use async_trait::async_trait;
use hipeac_core::{
    ContentTypeRef, Institution, Member, MemberId, MembershipType, Metadata, MetadataId,
    MetadataRelation, MetadataType, SslMode, UpstreamConfig,
};
use hipeac_directory::{DirectoryStore, ExpertiseTerm, MemberCriterion};
use sqlx::mysql::{MySql, MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::{Encode, QueryBuilder, Row, Type};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

const METADATA_COLUMNS: &str = "SELECT CAST(id AS SIGNED) AS id, `type`, value, \
     CAST(position AS SIGNED) AS position FROM hipeac_metadata";

const MEMBER_COLUMNS: &str = "SELECT CAST(id AS SIGNED) AS id, username, first_name, \
     last_name, email FROM hipeac_user";

/// Escape character used in every `LIKE` pattern.
const LIKE_ESCAPE: char = '!';

pub struct MySqlDirectoryStore {
    pool: MySqlPool,
    member_content_type: i64,
}

impl MySqlDirectoryStore {
    /// Open a read-only pool and resolve the member content type.
    pub async fn connect(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let options = MySqlConnectOptions::from_str(&config.connection_string())?
            .ssl_mode(ssl_mode(config.ssl_mode))
            .charset("utf8mb4");
        let pool_config = config.pool_config();

        let pool = MySqlPoolOptions::new()
            .min_connections(pool_config.min_connections)
            .max_connections(pool_config.max_connections)
            .acquire_timeout(Duration::from_secs(pool_config.acquire_timeout_seconds.into()))
            .idle_timeout(Some(Duration::from_secs(
                pool_config.idle_timeout_seconds.into(),
            )))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("SET SESSION TRANSACTION READ ONLY")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await?;

        tracing::info!(
            host = %config.host,
            database = %config.database,
            ssl_mode = ?config.ssl_mode,
            "Connected to upstream MySQL (read-only session)"
        );

        Self::from_pool(pool, &config.member_content_type).await
    }

    /// Wrap an existing pool. The caller is responsible for making its
    /// sessions read-only.
    pub async fn from_pool(pool: MySqlPool, content_type: &ContentTypeRef) -> anyhow::Result<Self> {
        let member_content_type: i64 = sqlx::query_scalar(
            "SELECT CAST(id AS SIGNED) FROM django_content_type WHERE app_label = ? AND model = ?",
        )
        .bind(&content_type.app_label)
        .bind(&content_type.model)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "content type '{}.{}' not found",
                content_type.app_label,
                content_type.model
            )
        })?;

        tracing::debug!(member_content_type, "Resolved member content type");

        Ok(Self {
            pool,
            member_content_type,
        })
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    async fn member_ids(&self, mut builder: QueryBuilder<'_, MySql>) -> anyhow::Result<BTreeSet<MemberId>> {
        let ids: Vec<i64> = builder.build_query_scalar().fetch_all(&self.pool).await?;
        Ok(ids.into_iter().collect())
    }

    /// Members linked to any of `ids` through a topic or application area table.
    fn linked_members(&self, relation: MetadataRelation, ids: &[MetadataId]) -> QueryBuilder<'_, MySql> {
        let (table, column) = relation_table(relation);
        let mut builder = QueryBuilder::new(format!(
            "SELECT DISTINCT CAST(object_id AS SIGNED) FROM {} WHERE content_type_id = ",
            table
        ));
        builder.push_bind(self.member_content_type);
        builder.push(format!(" AND {}", column));
        push_in_list(&mut builder, ids.iter().copied());
        builder
    }

    /// Members affiliated with an institution whose `column` is in `values`.
    fn institution_members<'args, T>(
        &self,
        column: &str,
        values: impl IntoIterator<Item = T>,
    ) -> QueryBuilder<'args, MySql>
    where
        T: 'args + Encode<'args, MySql> + Type<MySql> + Send,
    {
        let mut builder = QueryBuilder::new(
            "SELECT DISTINCT CAST(r.object_id AS SIGNED) FROM hipeac_rel_institutions r \
             JOIN hipeac_institution i ON i.id = r.institution_id WHERE r.content_type_id = ",
        );
        builder.push_bind(self.member_content_type);
        builder.push(format!(" AND i.{}", column));
        push_in_list(&mut builder, values);
        builder
    }
}

#[async_trait]
impl DirectoryStore for MySqlDirectoryStore {
    async fn metadata(&self, types: &[MetadataType]) -> anyhow::Result<Vec<Metadata>> {
        if types.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder = QueryBuilder::new(METADATA_COLUMNS);
        builder.push(" WHERE `type`");
        push_in_list(&mut builder, types.iter().map(|t| t.as_str()));
        builder.push(" ORDER BY `type`, position, value");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(metadata_from_row).collect()
    }

    async fn metadata_by_ids(&self, ids: &[MetadataId]) -> anyhow::Result<Vec<Metadata>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder = QueryBuilder::new(METADATA_COLUMNS);
        builder.push(" WHERE id");
        push_in_list(&mut builder, ids.iter().copied());

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(metadata_from_row).collect()
    }

    async fn find_metadata(
        &self,
        term: &ExpertiseTerm,
        types: &[MetadataType],
    ) -> anyhow::Result<Vec<Metadata>> {
        if types.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder = QueryBuilder::new(METADATA_COLUMNS);
        match term {
            ExpertiseTerm::Identifier(id) => {
                builder.push(" WHERE id = ");
                builder.push_bind(*id);
            }
            ExpertiseTerm::Name(name) => {
                builder.push(" WHERE LOWER(value) LIKE ");
                builder.push_bind(contains_pattern(name));
                builder.push(format!(" ESCAPE '{}'", LIKE_ESCAPE));
            }
        }
        builder.push(" AND `type`");
        push_in_list(&mut builder, types.iter().map(|t| t.as_str()));
        builder.push(" ORDER BY `type`, position, value");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(metadata_from_row).collect()
    }

    async fn active_member_ids(&self) -> anyhow::Result<BTreeSet<MemberId>> {
        self.member_ids(QueryBuilder::new(
            "SELECT DISTINCT CAST(user_id AS SIGNED) FROM hipeac_membership WHERE end_date IS NULL",
        ))
        .await
    }

    async fn member_ids_where(
        &self,
        criterion: &MemberCriterion,
    ) -> anyhow::Result<BTreeSet<MemberId>> {
        let builder = match criterion {
            MemberCriterion::Text(text) => {
                let pattern = contains_pattern(text);
                let mut builder = QueryBuilder::new("SELECT CAST(id AS SIGNED) FROM hipeac_user WHERE ");
                let mut clauses = builder.separated(" OR ");
                for column in ["first_name", "last_name", "email", "username"] {
                    clauses.push(format!("LOWER({}) LIKE ", column));
                    clauses.push_bind_unseparated(pattern.clone());
                    clauses.push_unseparated(format!(" ESCAPE '{}'", LIKE_ESCAPE));
                }
                builder
            }
            MemberCriterion::Topics(ids) if !ids.is_empty() => {
                self.linked_members(MetadataRelation::Topic, ids)
            }
            MemberCriterion::ApplicationAreas(ids) if !ids.is_empty() => {
                self.linked_members(MetadataRelation::ApplicationArea, ids)
            }
            MemberCriterion::Countries(codes) if !codes.is_empty() => {
                self.institution_members("country", codes.iter().cloned())
            }
            MemberCriterion::InstitutionTypes(ids) if !ids.is_empty() => {
                self.institution_members("type_id", ids.iter().copied())
            }
            MemberCriterion::MembershipTypes(types) if !types.is_empty() => {
                let mut builder = QueryBuilder::new(
                    "SELECT DISTINCT CAST(user_id AS SIGNED) FROM hipeac_membership WHERE `type`",
                );
                push_in_list(&mut builder, types.iter().map(|t| t.key()));
                builder
            }
            // An empty value list matches nobody.
            _ => return Ok(BTreeSet::new()),
        };
        self.member_ids(builder).await
    }

    async fn members(&self, ids: &[MemberId]) -> anyhow::Result<Vec<Member>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder = QueryBuilder::new(MEMBER_COLUMNS);
        builder.push(" WHERE id");
        push_in_list(&mut builder, ids.iter().copied());

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                Ok(Member {
                    id: row.try_get("id")?,
                    username: row.try_get("username")?,
                    first_name: row.try_get("first_name")?,
                    last_name: row.try_get("last_name")?,
                    email: row.try_get("email")?,
                })
            })
            .collect()
    }

    async fn institutions_of(&self, member: MemberId) -> anyhow::Result<Vec<Institution>> {
        let rows = sqlx::query(
            "SELECT CAST(i.id AS SIGNED) AS id, i.name, i.country, \
             CAST(i.type_id AS SIGNED) AS type_id \
             FROM hipeac_rel_institutions r \
             JOIN hipeac_institution i ON i.id = r.institution_id \
             WHERE r.content_type_id = ? AND r.object_id = ? \
             ORDER BY r.id",
        )
        .bind(self.member_content_type)
        .bind(member)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Institution {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    country: row.try_get("country")?,
                    type_id: row.try_get("type_id")?,
                })
            })
            .collect()
    }

    async fn metadata_ids_of(
        &self,
        member: MemberId,
        relation: MetadataRelation,
    ) -> anyhow::Result<Vec<MetadataId>> {
        let (table, column) = relation_table(relation);
        let sql = format!(
            "SELECT CAST({} AS SIGNED) FROM {} WHERE content_type_id = ? AND object_id = ? ORDER BY id",
            column, table
        );
        let ids = sqlx::query_scalar(&sql)
            .bind(self.member_content_type)
            .bind(member)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn active_membership_type(
        &self,
        member: MemberId,
    ) -> anyhow::Result<Option<MembershipType>> {
        let raw: Option<String> = sqlx::query_scalar(
            "SELECT `type` FROM hipeac_membership \
             WHERE user_id = ? AND end_date IS NULL ORDER BY id LIMIT 1",
        )
        .bind(member)
        .fetch_optional(&self.pool)
        .await?;

        Ok(raw.and_then(|raw| match raw.parse() {
            Ok(membership_type) => Some(membership_type),
            Err(e) => {
                tracing::warn!(member, error = %e, "Ignoring unknown membership type");
                None
            }
        }))
    }
}

fn ssl_mode(mode: SslMode) -> MySqlSslMode {
    match mode {
        SslMode::Disabled => MySqlSslMode::Disabled,
        SslMode::Preferred => MySqlSslMode::Preferred,
        SslMode::Required => MySqlSslMode::Required,
        SslMode::VerifyCa => MySqlSslMode::VerifyCa,
        SslMode::VerifyIdentity => MySqlSslMode::VerifyIdentity,
    }
}

/// Link table and target column for a member relation.
fn relation_table(relation: MetadataRelation) -> (&'static str, &'static str) {
    match relation {
        MetadataRelation::Topic => ("hipeac_rel_topics", "topic_id"),
        MetadataRelation::ApplicationArea => ("hipeac_rel_application_areas", "application_area_id"),
    }
}

/// Append ` IN (?, ?, ...)` binding every value. Callers guarantee at least one value.
fn push_in_list<'args, T>(builder: &mut QueryBuilder<'args, MySql>, values: impl IntoIterator<Item = T>)
where
    T: 'args + Encode<'args, MySql> + Type<MySql> + Send,
{
    builder.push(" IN (");
    let mut list = builder.separated(", ");
    for value in values {
        list.push_bind(value);
    }
    list.push_unseparated(")");
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Lowercased substring pattern for `LOWER(column) LIKE ?`.
fn contains_pattern(raw: &str) -> String {
    format!("%{}%", escape_like(&raw.to_lowercase()))
}

fn metadata_from_row(row: &MySqlRow) -> anyhow::Result<Metadata> {
    let metadata_type: String = row.try_get("type")?;
    let position: i64 = row.try_get("position")?;
    Ok(Metadata {
        id: row.try_get("id")?,
        metadata_type: metadata_type.parse()?,
        value: row.try_get("value")?,
        position: i32::try_from(position)?,
    })
}
