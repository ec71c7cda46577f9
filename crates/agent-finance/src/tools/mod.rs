//! Data tools behind the analysis procedures

pub mod fundamental;
pub mod macro_economic;
pub mod technical;

pub use fundamental::{FiscalQuarter, FundamentalAnalysisTool};
pub use macro_economic::MacroEconomicTool;
pub use technical::{PriceWindow, TechnicalAnalysisTool};
