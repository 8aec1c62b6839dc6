pub struct Icons;

impl Icons {
    pub const BONE: &str = "🦴";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const SKIP: &str = "⏭️";
    pub const CLIPBOARD: &str = "📋";
    pub const MEMO: &str = "📝";
    pub const FOLDER: &str = "📂";
    pub const WRENCH: &str = "🔧";
    pub const STATS: &str = "📊";
    pub const PARTY: &str = "🎉";
    pub const DRY: &str = "🏃";
}
