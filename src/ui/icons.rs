pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const DATABASE: &str = "🗄️";
    pub const PERSON: &str = "👤";
    pub const BOOK: &str = "📚";
    pub const CLOCK: &str = "⏱️";
    pub const STAR: &str = "⭐";
}
