use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_tree::HierarchicalLayer;
use tracing_tree::time::Uptime;

/// Installs the global subscriber. Filtering follows `RUST_LOG`, falling
/// back to `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let tree = HierarchicalLayer::new(2)
        .with_indent_lines(true)
        .with_targets(true)
        .with_bracketed_fields(true)
        .with_timer(Uptime::default());
    // A subscriber may already be installed by tests.
    let _ = tracing_subscriber::registry().with(filter).with(tree).try_init();
}
