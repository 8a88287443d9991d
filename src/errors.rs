use std::fmt;

#[derive(Debug, Clone)]
pub enum StatsError {
    Config(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    KafkaConnection(String),
    KafkaOperation(String),
    Tracker(String),
    Serialization(String),
    Validation(String),
    IdGenerator(String),
    FileOperation(String),
}

impl StatsError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            StatsError::Config(_) => "E001",
            StatsError::DatabaseConfig(_) => "E002",
            StatsError::DatabaseConnection(_) => "E003",
            StatsError::DatabaseOperation(_) => "E004",
            StatsError::KafkaConnection(_) => "E005",
            StatsError::KafkaOperation(_) => "E006",
            StatsError::Tracker(_) => "E007",
            StatsError::Serialization(_) => "E008",
            StatsError::Validation(_) => "E009",
            StatsError::IdGenerator(_) => "E010",
            StatsError::FileOperation(_) => "E011",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            StatsError::Config(_) => "Configuration Error",
            StatsError::DatabaseConfig(_) => "Database Configuration Error",
            StatsError::DatabaseConnection(_) => "Database Connection Error",
            StatsError::DatabaseOperation(_) => "Database Operation Error",
            StatsError::KafkaConnection(_) => "Kafka Connection Error",
            StatsError::KafkaOperation(_) => "Kafka Operation Error",
            StatsError::Tracker(_) => "Event Tracker Error",
            StatsError::Serialization(_) => "Serialization Error",
            StatsError::Validation(_) => "Validation Error",
            StatsError::IdGenerator(_) => "Id Generator Error",
            StatsError::FileOperation(_) => "File Operation Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            StatsError::Config(msg) => msg,
            StatsError::DatabaseConfig(msg) => msg,
            StatsError::DatabaseConnection(msg) => msg,
            StatsError::DatabaseOperation(msg) => msg,
            StatsError::KafkaConnection(msg) => msg,
            StatsError::KafkaOperation(msg) => msg,
            StatsError::Tracker(msg) => msg,
            StatsError::Serialization(msg) => msg,
            StatsError::Validation(msg) => msg,
            StatsError::IdGenerator(msg) => msg,
            StatsError::FileOperation(msg) => msg,
        }
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code(), self.format_simple())
    }
}

impl std::error::Error for StatsError {}

// 便捷的构造函数
impl StatsError {
    pub fn config<T: Into<String>>(msg: T) -> Self {
        StatsError::Config(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        StatsError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        StatsError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        StatsError::DatabaseOperation(msg.into())
    }

    pub fn kafka_connection<T: Into<String>>(msg: T) -> Self {
        StatsError::KafkaConnection(msg.into())
    }

    pub fn kafka_operation<T: Into<String>>(msg: T) -> Self {
        StatsError::KafkaOperation(msg.into())
    }

    pub fn tracker<T: Into<String>>(msg: T) -> Self {
        StatsError::Tracker(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        StatsError::Serialization(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        StatsError::Validation(msg.into())
    }

    pub fn id_generator<T: Into<String>>(msg: T) -> Self {
        StatsError::IdGenerator(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        StatsError::FileOperation(msg.into())
    }
}

impl From<sea_orm::DbErr> for StatsError {
    fn from(err: sea_orm::DbErr) -> Self {
        StatsError::DatabaseOperation(err.to_string())
    }
}

impl From<rdkafka::error::KafkaError> for StatsError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        StatsError::KafkaOperation(err.to_string())
    }
}

impl From<redis::RedisError> for StatsError {
    fn from(err: redis::RedisError) -> Self {
        StatsError::Tracker(err.to_string())
    }
}

impl From<serde_json::Error> for StatsError {
    fn from(err: serde_json::Error) -> Self {
        StatsError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StatsError {
    fn from(err: std::io::Error) -> Self {
        StatsError::FileOperation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StatsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = [
            StatsError::config("a"),
            StatsError::database_config("a"),
            StatsError::database_connection("a"),
            StatsError::database_operation("a"),
            StatsError::kafka_connection("a"),
            StatsError::kafka_operation("a"),
            StatsError::tracker("a"),
            StatsError::serialization("a"),
            StatsError::validation("a"),
            StatsError::id_generator("a"),
            StatsError::file_operation("a"),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_display_includes_code_and_message() {
        let err = StatsError::validation("batch_size must be positive");
        assert_eq!(
            err.to_string(),
            "[E009] Validation Error: batch_size must be positive"
        );
    }

    #[test]
    fn test_from_serde_error() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: StatsError = parse_err.into();
        assert_eq!(err.code(), "E008");
    }
}
