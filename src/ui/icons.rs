pub struct Icons;

impl Icons {
    pub const BULB: &str = "💡";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const SEARCH: &str = "🔍";
    pub const DATABASE: &str = "🗄️";
    pub const ROBOT: &str = "🤖";
    pub const CALENDAR: &str = "📅";
    pub const KEY: &str = "🔑";
    pub const GLOBE: &str = "🌍";
    pub const SEAL: &str = "🔏";
    pub const FILE: &str = "📄";
}
