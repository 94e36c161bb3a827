use redis::{Cmd, ToRedisArgs};

/// Conditional push: appends only if the topic's list already exists.
pub const PRODUCE: &str = "RPUSHX";
/// Broker-side flush bounded by a millisecond timeout.
pub const FLUSH: &str = "DUMP";

const TOPIC_KEY_PREFIX: &str = "topics:";

pub fn topic_key(topic: &str) -> String {
    format!("{}{}", TOPIC_KEY_PREFIX, topic)
}

pub fn produce<M: ToRedisArgs>(topic: &str, message: M) -> Cmd {
    let mut cmd = redis::cmd(PRODUCE);
    cmd.arg(topic_key(topic)).arg(message);
    cmd
}

pub fn flush(timeout_ms: u64) -> Cmd {
    let mut cmd = redis::cmd(FLUSH);
    cmd.arg(timeout_ms.to_string());
    cmd
}
