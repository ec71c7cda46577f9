//! Fixed user-facing replies

/// Fundamental or technical intent with a ticker that does not resolve
pub const TICKER_NOT_FOUND: &str =
    "Ticker not found! please input the correct ticker name (Read Descalimer).";

/// Technical intent without any ticker
pub const TICKER_MISSING: &str = "Please specify the stock ticker you want technical analysis for. \
     Example: 'Technical analysis AAPL for 3 months.'";

/// Macro intent whose subject is neither a country nor a company
pub const MACRO_NOT_FOUND: &str =
    "Country or ticker not found! please input the correct ticker or country name (Read Descalimer).";

/// Dispatched intent with nothing usable to act on
pub const NOT_UNDERSTOOD: &str =
    "Sorry, I couldn't understand your request or the input was missing.";

/// Every intent in the batch failed or was skipped
pub const NO_RELEVANT_INFO: &str =
    "Sorry, I couldn't find any relevant information for your request.";

/// Classifier output did not match the intent contract
pub const PARSE_FAILURE: &str = "Sorry, I couldn\u{2019}t understand your request.";

/// A completion service call failed during the turn
pub const TURN_FAILURE: &str = "Sorry, something went wrong while processing your request. Please try again.";

/// Shown when the idle timeout cleared the conversation
pub const SESSION_TIMEOUT: &str = "Session timed out. Chat cleared.";

/// Reply to an empty prompt
pub const EMPTY_PROMPT: &str = "Ask something...";

/// Banner shown before the first turn
pub const DISCLAIMER: &str = "Financial assistant: technical analysis, fundamental analysis, \
     macroeconomic outlook and general questions.\n\
     Non-U.S. tickers need the Yahoo Finance exchange suffix (BBCA.JK, 7203.T, VOD.L, RY.TO).\n\
     Disclaimer: the analysis is not 100% correct. DYOR (do your own research).";
