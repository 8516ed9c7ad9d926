/// Crawl run phases and the transitions allowed between them
use std::fmt;

/// Where a crawl run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Not started, or finished normally
    Idle,

    /// Fetching a search-results page
    FetchingList,

    /// Inspecting the classified page for blocking signals
    SafetyCheck,

    /// Pulling candidate links out of a search-results page
    ExtractingLinks,

    /// Fetching and persisting candidate detail pages
    FetchingDetail,

    /// Deciding whether and where to go next
    Paginating,

    /// Halted by a blocking page, a transport failure or cancellation
    Stopped,
}

impl CrawlPhase {
    /// Returns true if the run can make no further progress
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Checks the transition table
    ///
    /// Any phase may move to `Stopped`. `SafetyCheck` is entered after list
    /// and detail fetches alike.
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        use CrawlPhase::*;

        if next == Stopped {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (Idle, FetchingList)
                | (FetchingList, SafetyCheck)
                | (SafetyCheck, ExtractingLinks)
                | (SafetyCheck, FetchingDetail)
                | (ExtractingLinks, FetchingDetail)
                | (ExtractingLinks, Paginating)
                | (FetchingDetail, SafetyCheck)
                | (FetchingDetail, Paginating)
                | (Paginating, FetchingList)
                | (Paginating, Idle)
        )
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::FetchingList => "fetching_list",
            Self::SafetyCheck => "safety_check",
            Self::ExtractingLinks => "extracting_links",
            Self::FetchingDetail => "fetching_detail",
            Self::Paginating => "paginating",
            Self::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}
