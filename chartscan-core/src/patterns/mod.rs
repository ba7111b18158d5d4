//! Chart-pattern detectors.
//!
//! Pivot extraction feeds support/resistance clustering and trend lines;
//! those feed breakout grading. The trend template and VCP analyzers run
//! on the series directly.

pub mod breakout;
pub mod detector;
pub mod levels;
pub mod pivot;
pub mod screener;
pub mod trendline;
pub mod vcp;

pub use breakout::{
    breakout_targets, evaluate_buy_signal, grade_breakout, BreakoutTargets, BuySignalParams, GradedBreakout,
    Probability, TargetParams,
};
pub use detector::PatternDetector;
pub use levels::{cluster_prices, separate_levels, ClusterParams, Level, LevelStrategy, SupportResistance};
pub use pivot::{find_pivots, pivot_at, Pivot, PivotKind, PivotWindow};
pub use screener::{TemplateCriteria, TemplateReport, TrendTemplate};
pub use trendline::{build_trend_line, Anchor, PivotSide, TrendLine};
pub use vcp::{AtrParams, Contraction, SwingParams, VcpEvidence, VcpSignal, VcpStage, VcpStrategy};
