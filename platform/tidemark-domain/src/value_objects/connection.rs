/// Everything needed to open one PostgreSQL session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl ConnectionConfig {
    /// Same server and credentials, different database. Used to reach
    /// the admin database before the target one exists.
    pub fn with_database(&self, database: &str) -> Self {
        Self {
            database: database.to_string(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_database_keeps_credentials() {
        let base = ConnectionConfig {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "secret".to_string(),
            database: "market".to_string(),
        };
        let admin = base.with_database("postgres");
        assert_eq!(admin.database, "postgres");
        assert_eq!(admin.user, base.user);
        assert_eq!(admin.password, base.password);
        assert_eq!(admin.host, base.host);
        assert_eq!(admin.port, base.port);
    }
}
