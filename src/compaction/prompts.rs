//! Prompt templates for compaction summaries.

pub(crate) const SUMMARY_OUTPUT_FORMAT: &str = "\
Return ONLY markdown in this exact structure:

## Goal
[What the user is trying to accomplish]

## Constraints & Preferences
- [Requirements, constraints, style preferences]

## Progress
### Done
- [x] [Completed work with file paths]
### In Progress
- [ ] [Current active work]

## Key Decisions
- **[Decision]**: [Rationale]

## Next Steps
1. [Immediate next step]

## Files Touched
### Read
- [path]
### Modified
- [path]

## Critical Context
- [Essential details needed to continue]
";

/// Build the prompt for a first-time summary.
pub(crate) fn fresh_summary_prompt(serialized_messages: &str) -> String {
    format!(
        "You are generating a compaction summary for an AI coding assistant.\n\n\
         Summarize the serialized conversation transcript below so the assistant can continue\n\
         without losing critical context.\n\n\
         {SUMMARY_OUTPUT_FORMAT}\n\
         Conversation transcript:\n\
         {serialized_messages}\n"
    )
}

/// Build the prompt for an iterative update to an existing summary.
pub(crate) fn iterative_summary_prompt(previous_summary: &str, serialized_messages: &str) -> String {
    format!(
        "You are updating an existing compaction summary for an AI coding assistant.\n\n\
         Incorporate the new transcript into the previous summary, preserving important prior\n\
         context while removing stale details.\n\n\
         {SUMMARY_OUTPUT_FORMAT}\n\
         Previous summary:\n\
         {previous_summary}\n\n\
         New transcript:\n\
         {serialized_messages}\n"
    )
}
