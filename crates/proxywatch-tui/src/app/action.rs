/// All possible actions in the application (command pattern)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Quit,
    ToggleHelp,

    // Monitoring
    ToggleMonitoring,
    ClearEntries,

    // Filter input
    OpenFilter,
    CloseFilter,
    FilterInput(char),
    FilterBackspace,
    FilterClear,
    ApplyFilter,
    ClearFilter,
    CycleSeverity,

    // Log viewer actions
    ScrollUp(usize),
    ScrollDown(usize),
    ScrollToTop,
    ScrollToBottom,
    PageUp,
    PageDown,
    ToggleAutoScroll,
    ToggleTimestamps,
    ToggleStats,
    ExportEntries,

    DismissError,
}
