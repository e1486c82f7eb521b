use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    // Create contacts table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS contacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            phone_number VARCHAR(50),
            email VARCHAR(255),
            linked_id INTEGER,
            link_precedence VARCHAR NOT NULL DEFAULT 'primary' CHECK (link_precedence IN ('primary', 'secondary')),
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL,
            deleted_at BIGINT,
            FOREIGN KEY (linked_id) REFERENCES contacts (id)
        )",
        [],
    )?;

    // Lookup indexes for matching and graph traversal
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_contacts_email ON contacts(email)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_contacts_phone_number ON contacts(phone_number)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_contacts_linked_id ON contacts(linked_id)",
        [],
    )?;

    Ok(())
}

/// Drop every contact and recreate the schema.
pub fn reset_contacts(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("DROP TABLE IF EXISTS contacts", [])?;
    run_migrations(conn)?;
    tracing::info!("Contacts table dropped and recreated");
    Ok(())
}
