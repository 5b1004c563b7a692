// All LLM prompt constants for the synthesis pipeline.

/// System prompt for DRAFTING — enforces JSON-only output.
pub const DRAFT_SYSTEM: &str =
    "You are a scheduling assistant generating a recommended calendar for the \
    upcoming week from a user's observed work patterns. \
    You MUST respond with valid JSON only — a JSON array of event objects. \
    Do NOT include any text outside the JSON array. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Drafting prompt template.
/// Replace: {today}, {today_weekday}, {context_json}
pub const DRAFT_PROMPT_TEMPLATE: &str = r#"Generate a recommended schedule for the upcoming week from the structured context below.

TODAY: {today} ({today_weekday})

CONTEXT:
{context_json}

How to build the schedule:

1. Respect the user's preferences: timezone, working hours, and week start day.
2. Weight work patterns by frequency — higher-frequency patterns are stronger signals for when this user actually works.
3. Allocate time to projects according to their recent engagement (work patterns and artifact patterns that reference them).
4. Every event must fall on one of the week_dates, inside the user's working hours.
5. Treat locked_events as immovable: never overlap them, and leave at least a 15-minute break around them.
6. Mix focused work, project tasks, and planning; include buffer time between events for context switching.
7. Keep every event 3 hours or shorter and leave at least a 15-minute break between consecutive events.

Return a JSON ARRAY:
[
  {
    "title": "Deep work: payment-service refactor",
    "suggestedStartTime": "2026-08-10T09:00:00+02:00",
    "suggestedEndTime": "2026-08-10T11:00:00+02:00",
    "priority": 2
  }
]

HARD RULES:
1. `suggestedStartTime` / `suggestedEndTime` are ISO 8601 timestamps with a timezone offset
2. `priority` is an integer from 1 (highest) to 5 (lowest)
3. Events must not overlap each other or any locked event
4. Events outside the week dates or the working-hour window will be discarded"#;

/// System prompt for DETAILING — enforces a JSON object.
pub const DETAIL_SYSTEM: &str =
    "You are a scheduling assistant writing a short working brief for one \
    planned calendar event, grounded in the user's engineering history. \
    You MUST respond with a single valid JSON object. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Detailing prompt template, one call per drafted task.
/// Replace: {title}, {window}, {related_context}
pub const DETAIL_PROMPT_TEMPLATE: &str = r#"Write a working brief for this planned event.

EVENT: {title}
SCHEDULED: {window}

RELATED HISTORY (retrieved from the user's issues, pull requests, commits and calendar — may be empty):
{related_context}

Return a JSON object:
{
  "description": "One or two sentences on what this block is for and why now.",
  "steps": "Short ordered plan, one step per line.",
  "background": "Relevant context from the history above, if any.",
  "challenges": "Likely blockers or open questions, if any."
}

Ground `background` and `challenges` in the related history when it is relevant; otherwise keep them brief and generic. Never invent specific issue or PR references."#;

/// System prompt for REFINING — enforces JSON-only output.
pub const REFINE_SYSTEM: &str =
    "You are a scheduling assistant reviewing a full draft week for \
    consistency. You MUST respond with valid JSON only — the revised array \
    in the same schema you were given. \
    Do NOT include any text outside the JSON array. \
    Do NOT use markdown code fences.";

/// Refining prompt template.
/// Replace: {events_json}
pub const REFINE_PROMPT_TEMPLATE: &str = r#"Review this draft week as a whole and return a revised version of the same JSON array.

DRAFT EVENTS:
{events_json}

Check for:
1. Ordering — dependent work (per descriptions and steps) scheduled before the work that needs it
2. Conflicts — overlapping events, or breaks shorter than 15 minutes between consecutive events
3. Balance — no day overloaded while another is empty, given the same total workload

Adjust titles, times, or priorities only where one of these checks fails; otherwise return events unchanged. Keep the same JSON schema for every event. Do not add or invent new events."#;
