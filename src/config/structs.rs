use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// 默认点击事件主题
pub const DEFAULT_CLICK_TOPIC: &str = "short-link-click-events";

/// 静态配置（从 TOML 加载，启动时使用）
///
/// - database: 数据库连接配置
/// - logging: 日志配置
/// - kafka: broker 与消费组配置
/// - tracker: 幂等追踪配置
/// - id_generator: ID 生成器配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub kafka: KafkaConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub id_generator: IdGeneratorConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：CS，分隔符：__
    /// 示例：CS__DATABASE__DATABASE_URL=mysql://root@localhost/stats
    pub fn load(path: &str) -> crate::errors::Result<Self> {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖，前缀 CS，分隔符 __
            .add_source(
                Environment::with_prefix("CS")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings = builder
            .build()
            .map_err(|e| crate::errors::StatsError::config(format!("build config: {}", e)))?;
        let config = settings.try_deserialize::<StaticConfig>().map_err(|e| {
            crate::errors::StatsError::config(format!("deserialize config: {}", e))
        })?;

        if std::path::Path::new(path).exists() {
            eprintln!("[INFO] Configuration loaded from: {}", path);
        }
        Ok(config)
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// Kafka 集群配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    #[serde(default = "default_brokers")]
    pub brokers: Vec<String>,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// broker 协议版本，如 "2.8.0"
    #[serde(default = "default_kafka_version")]
    pub version: String,
    /// 消费出错后重新订阅前的等待时间
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    #[serde(default = "default_groups")]
    pub groups: Vec<GroupConfig>,
}

/// 消费组使用的处理器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HandlerKind {
    /// 聚合写入 click_stats_summary
    Summary,
    /// 逐条写入 click_events
    Detail,
}

/// 起始 offset 策略（无已提交 offset 时）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AutoOffset {
    #[default]
    Earliest,
    Latest,
}

/// 单个消费组配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub group_id: String,
    #[serde(default = "default_topics")]
    pub topics: Vec<String>,
    pub handler: HandlerKind,
    #[serde(default = "default_fetch_max_bytes")]
    pub fetch_max_bytes: u32,
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
    #[serde(default)]
    pub auto_commit: bool,
    #[serde(default = "default_auto_commit_interval_ms")]
    pub auto_commit_interval_ms: u64,
    #[serde(default)]
    pub auto_offset: AutoOffset,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_cron_spec")]
    pub cron_spec: String,
}

impl GroupConfig {
    /// 心跳间隔 = session timeout / 3
    pub fn heartbeat_interval_ms(&self) -> u64 {
        (self.session_timeout_ms / 3).max(1)
    }
}

/// 幂等追踪后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrackerType {
    #[default]
    None,
    Memory,
    Redis,
}

/// 幂等追踪配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(rename = "type", default)]
    pub tracker_type: TrackerType,
    #[serde(default = "default_tracker_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_tracker_capacity")]
    pub max_capacity: u64,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
}

/// ID 生成器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdGeneratorConfig {
    #[serde(default = "default_node_id")]
    pub node_id: u16,
}

// ============================================================
// Default value functions
// ============================================================

fn default_database_url() -> String {
    "sqlite://clickstats.db?mode=rwc".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_brokers() -> Vec<String> {
    vec!["127.0.0.1:9092".to_string()]
}

fn default_client_id() -> String {
    "clickstats".to_string()
}

fn default_kafka_version() -> String {
    "2.8.0".to_string()
}

fn default_backoff_ms() -> u64 {
    1000
}

fn default_topics() -> Vec<String> {
    vec![DEFAULT_CLICK_TOPIC.to_string()]
}

fn default_fetch_max_bytes() -> u32 {
    10 * 1024 * 1024
}

fn default_session_timeout_ms() -> u64 {
    10_000
}

fn default_auto_commit_interval_ms() -> u64 {
    1000
}

fn default_batch_size() -> usize {
    100
}

fn default_cron_spec() -> String {
    "@every 10s".to_string()
}

fn default_groups() -> Vec<GroupConfig> {
    vec![
        GroupConfig {
            group_id: "stats-group-total".to_string(),
            ..GroupConfig::new(HandlerKind::Summary)
        },
        GroupConfig {
            group_id: "stats-group-detail".to_string(),
            ..GroupConfig::new(HandlerKind::Detail)
        },
    ]
}

fn default_tracker_ttl() -> u64 {
    7 * 24 * 3600
}

fn default_tracker_capacity() -> u64 {
    1_000_000
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}

fn default_redis_key_prefix() -> String {
    "clickstats:processed:".to_string()
}

fn default_node_id() -> u16 {
    1
}

// ============================================================
// Default implementations
// ============================================================

impl GroupConfig {
    /// 以默认调优参数构造指定处理器类型的消费组
    pub fn new(handler: HandlerKind) -> Self {
        Self {
            group_id: String::new(),
            topics: default_topics(),
            handler,
            fetch_max_bytes: default_fetch_max_bytes(),
            session_timeout_ms: default_session_timeout_ms(),
            auto_commit: false,
            auto_commit_interval_ms: default_auto_commit_interval_ms(),
            auto_offset: AutoOffset::default(),
            batch_size: default_batch_size(),
            cron_spec: default_cron_spec(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            client_id: default_client_id(),
            version: default_kafka_version(),
            backoff_ms: default_backoff_ms(),
            groups: default_groups(),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tracker_type: TrackerType::default(),
            ttl_secs: default_tracker_ttl(),
            max_capacity: default_tracker_capacity(),
            redis_url: default_redis_url(),
            key_prefix: default_redis_key_prefix(),
        }
    }
}

impl Default for IdGeneratorConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
        }
    }
}
