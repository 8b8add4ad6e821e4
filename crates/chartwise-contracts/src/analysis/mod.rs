mod requests;
mod results;
mod trend;

pub use requests::{
    normalize_symbol, split_data_url, AnalysisRequest, ChartImage, Operation, DEFAULT_IMAGE_MIME,
};
pub use results::{AnalysisOutput, AnalysisResult, PairAnalysisResult, PatternExplanation};
pub use trend::{ColorTag, Trend};
