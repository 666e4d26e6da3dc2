pub mod analysis;

pub use analysis::{ AdviceResult, ChatResult, ConversationTurn, TurnAnalysisResult, TurnStatus };
