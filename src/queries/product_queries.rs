use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::Result,
    models::{
        ListingPage, ListingState, PageSize, Product, ProductFields, RecordScope, clamp_page,
        last_page, offset,
    },
};

const PRODUCT_SELECT: &str = r#"
    SELECT
        p.id, p.name, p.price, p.stock, p.category_id, c.name AS category_name,
        p.description, p.image_path, p.deleted_at, p.created_at, p.updated_at
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
"#;

fn scope_condition(scope: RecordScope) -> &'static str {
    match scope {
        RecordScope::Active => " AND p.deleted_at IS NULL",
        RecordScope::Trashed => " AND p.deleted_at IS NOT NULL",
        RecordScope::Any => "",
    }
}

/// Escapes LIKE wildcards so user input is matched literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

pub async fn find_by_id(pool: &PgPool, id: i32, scope: RecordScope) -> Result<Option<Product>> {
    let sql = format!("{} WHERE p.id = $1{}", PRODUCT_SELECT, scope_condition(scope));

    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(product)
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, state: &ListingState) {
    if let Some(term) = state.search_term() {
        let pattern = like_pattern(term);
        query.push(" AND (p.name ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR c.name ILIKE ");
        query.push_bind(pattern);
        query.push(")");
    }

    if let Some(category_id) = state.category_id {
        query.push(" AND p.category_id = ");
        query.push_bind(category_id);
    }
}

/// Sort key in the chosen direction, then id ascending.
fn order_clause(state: &ListingState) -> String {
    format!(
        " ORDER BY {} {}, p.id ASC",
        state.sort_field.as_sql(),
        state.sort_direction.as_sql()
    )
}

pub async fn search_products(pool: &PgPool, state: &ListingState) -> Result<ListingPage> {
    // counts first, the requested page is clamped against the filtered total
    let mut count_query: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT COUNT(*) FROM products p LEFT JOIN categories c ON c.id = p.category_id WHERE p.deleted_at IS NULL",
    );
    push_filters(&mut count_query, state);
    let filtered_count: i64 = count_query.build_query_scalar().fetch_one(pool).await?;

    let total_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE deleted_at IS NULL")
            .fetch_one(pool)
            .await?;

    let page = clamp_page(state.page, filtered_count, state.page_size);

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(PRODUCT_SELECT);
    query.push(" WHERE p.deleted_at IS NULL");
    push_filters(&mut query, state);

    query.push(order_clause(state));

    query.push(" LIMIT ");
    query.push_bind(i64::from(state.page_size.get()));
    query.push(" OFFSET ");
    query.push_bind(offset(page, state.page_size));

    let items = query.build_query_as::<Product>().fetch_all(pool).await?;

    Ok(ListingPage {
        items,
        total_count,
        filtered_count,
        page,
        last_page: last_page(filtered_count, state.page_size),
        page_size: state.page_size.get(),
    })
}

pub async fn find_trashed(pool: &PgPool, page: u32, page_size: PageSize) -> Result<ListingPage> {
    let trashed_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE deleted_at IS NOT NULL")
            .fetch_one(pool)
            .await?;

    let page = clamp_page(page, trashed_count, page_size);

    let sql = format!(
        "{} WHERE p.deleted_at IS NOT NULL ORDER BY p.deleted_at DESC, p.id ASC LIMIT $1 OFFSET $2",
        PRODUCT_SELECT
    );

    let items = sqlx::query_as::<_, Product>(&sql)
        .bind(i64::from(page_size.get()))
        .bind(offset(page, page_size))
        .fetch_all(pool)
        .await?;

    Ok(ListingPage {
        items,
        total_count: trashed_count,
        filtered_count: trashed_count,
        page,
        last_page: last_page(trashed_count, page_size),
        page_size: page_size.get(),
    })
}

pub async fn name_exists(pool: &PgPool, name: &str, except_id: Option<i32>) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM products
            WHERE name = $1
              AND deleted_at IS NULL
              AND ($2::INTEGER IS NULL OR id <> $2)
        )
        "#,
    )
    .bind(name)
    .bind(except_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

pub async fn create_product(pool: &PgPool, fields: &ProductFields) -> Result<i32> {
    let id: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO products (name, price, stock, category_id, description, image_path)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(&fields.name)
    .bind(fields.price)
    .bind(fields.stock)
    .bind(fields.category_id)
    .bind(&fields.description)
    .bind(&fields.image_path)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// A `None` image path keeps the stored one.
pub async fn update_product(pool: &PgPool, id: i32, fields: &ProductFields) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET
            name = $1,
            price = $2,
            stock = $3,
            category_id = $4,
            description = $5,
            image_path = COALESCE($6, image_path),
            updated_at = NOW()
        WHERE id = $7 AND deleted_at IS NULL
        "#,
    )
    .bind(&fields.name)
    .bind(fields.price)
    .bind(fields.stock)
    .bind(fields.category_id)
    .bind(&fields.description)
    .bind(&fields.image_path)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn soft_delete_product(pool: &PgPool, id: i32) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE products SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn restore_product(pool: &PgPool, id: i32) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE products SET deleted_at = NULL, updated_at = NOW() WHERE id = $1 AND deleted_at IS NOT NULL",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn purge_product(pool: &PgPool, id: i32) -> Result<u64> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1 AND deleted_at IS NOT NULL")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn is_trashed(pool: &PgPool, id: i32) -> Result<bool> {
    let trashed: Option<bool> =
        sqlx::query_scalar("SELECT deleted_at IS NOT NULL FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    Ok(trashed.unwrap_or(false))
}
