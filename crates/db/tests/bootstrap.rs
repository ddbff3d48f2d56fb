use sqlx::PgPool;

/// Full bootstrap test: connect, migrate, verify seed data.
#[sqlx::test(migrations = "./migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    gatekeeper_db::health_check(&pool).await.unwrap();

    let system_roles: Vec<(String,)> =
        sqlx::query_as("SELECT name FROM roles WHERE is_system_role ORDER BY name")
            .fetch_all(&pool)
            .await
            .unwrap();
    let names: Vec<&str> = system_roles.iter().map(|(n,)| n.as_str()).collect();
    assert_eq!(names, gatekeeper_core::roles::SYSTEM_ROLES);

    let (permission_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM permissions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(permission_count, 13);

    // The admin role carries every seeded permission.
    let (admin_grants,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM role_permissions rp
         JOIN roles r ON r.id = rp.role_id
         WHERE r.name = 'admin'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(admin_grants, permission_count);
}

/// Every seeded permission name parses as `resource:action`.
#[sqlx::test(migrations = "./migrations")]
async fn test_seeded_permissions_are_well_formed(pool: PgPool) {
    let rows: Vec<(String, String, String)> =
        sqlx::query_as("SELECT name, resource, action FROM permissions")
            .fetch_all(&pool)
            .await
            .unwrap();

    for (name, resource, action) in rows {
        let parsed = gatekeeper_core::permission::PermissionName::parse(&name).unwrap();
        assert_eq!(parsed.resource, resource);
        assert_eq!(parsed.action, action);
    }
}

/// All `id` columns are uuid.
#[sqlx::test(migrations = "./migrations")]
async fn test_all_pks_are_uuid(pool: PgPool) {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT table_name, data_type
         FROM information_schema.columns
         WHERE column_name = 'id'
           AND table_schema = 'public'
           AND table_name != '_sqlx_migrations'
         ORDER BY table_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(!rows.is_empty());
    for (table, data_type) in &rows {
        assert_eq!(data_type, "uuid", "Table {table}.id should be uuid");
    }
}

/// Unique constraints follow the `uq_` naming the API error mapper relies on.
#[sqlx::test(migrations = "./migrations")]
async fn test_unique_constraints_are_prefixed(pool: PgPool) {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT constraint_name
         FROM information_schema.table_constraints
         WHERE table_schema = 'public' AND constraint_type = 'UNIQUE'",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for (name,) in &rows {
        assert!(name.starts_with("uq_"), "unique constraint {name} lacks uq_ prefix");
    }
}
