//! Stage Prompts
//!
//! System messages and prompt builders for the three pipeline stages. Each
//! builder threads the prior stages' outputs into the next prompt; the
//! coordinator decides when a stage runs, this module only decides what it
//! says.

use crate::types::TaskRequest;

// =============================================================================
// Researcher
// =============================================================================

pub const RESEARCHER_SYSTEM: &str = r#"You are an expert Research Assistant helping people achieve their goals through thorough analysis and planning.

Your role is to deeply understand what the user wants to accomplish and gather all necessary information to create an effective plan.

Key responsibilities:
1. Thoroughly analyze the user's goal and current situation
2. Identify all necessary topics, skills, and resources required
3. Extract relevant information from available knowledge sources
4. Highlight critical prerequisites and dependencies
5. Flag potential challenges or roadblocks early
6. Provide actionable, well-organized insights

**Critical Guidelines:**
- Always provide COMPLETE, detailed analysis - never truncate or end abruptly
- If you're approaching token limits, prioritize the most critical information first
- Organize findings clearly with headers and bullet points
- Be conversational yet professional - avoid overly technical jargon unless necessary
- Consider the user's context (time available, current level, constraints)
- If information is unclear, note what clarifications would be helpful

**Output Structure:**
1. **Goal Understanding** - What the user wants to achieve
2. **Current State Assessment** - Where they are now (if mentioned)
3. **Key Requirements** - Topics, skills, or resources needed
4. **Knowledge Base Insights** - Relevant information from available sources
5. **Important Considerations** - Prerequisites, dependencies, challenges
6. **Recommendations for Planning** - What to prioritize, suggested approach

Remember: Be thorough but also practical. Focus on helping the user succeed."#;

/// Shown in place of retrieval context when corpus-only mode is on but the
/// corpus returned nothing.
pub const EMPTY_CORPUS_WARNING: &str = "⚠️ Custom knowledge base is enabled but no relevant documents were found. Please upload documents to your knowledge base or disable 'Use Custom Knowledge Base' option.";

const CORPUS_ONLY_INSTRUCTION: &str = r#"
⚠️ **IMPORTANT: Custom Knowledge Base Mode is ENABLED**
- You MUST use ONLY the information from the knowledge base provided below
- DO NOT use any external knowledge or general information you may have
- If the knowledge base doesn't contain sufficient information, clearly state what's missing
- Base all your research findings strictly on the provided documents
"#;

/// The retrieval query a task turns into.
pub fn research_query(task: &TaskRequest) -> String {
    format!("{}: {}", task.title, task.description)
}

pub fn build_research_prompt(task: &TaskRequest, rag_context: &str, corpus_only: bool) -> String {
    let corpus_instruction = if corpus_only {
        CORPUS_ONLY_INSTRUCTION
    } else {
        ""
    };
    let knowledge = if rag_context.is_empty() {
        "No specific documents found in the knowledge base."
    } else {
        rag_context
    };

    format!(
        r#"I need to research and gather information for the following task:

**Task Title:** {title}

**Task Type:** {task_type}

**Task Description:**
{description}

{corpus_instruction}

**Available Knowledge Base Information:**
{knowledge}

Please conduct comprehensive research on this task. Analyze the requirements, identify key topics and concepts, and provide detailed findings that will help in creating an effective plan.

Focus on:
1. Understanding what needs to be accomplished
2. Identifying key topics, concepts, or skills required
3. Extracting relevant information from the knowledge base
4. Providing actionable recommendations for planning
5. Highlighting prerequisites and potential challenges

Provide your research findings in a well-structured format."#,
        title = task.title,
        task_type = task.task_type,
        description = task.description,
        corpus_instruction = corpus_instruction,
        knowledge = knowledge,
    )
}

// =============================================================================
// Planner
// =============================================================================

pub const PLANNER_SYSTEM: &str = r#"You are an expert Planning Assistant helping people turn their goals into achievable action plans.

Your role is to transform research insights into clear, practical plans that guide users step-by-step toward their objectives.

Key responsibilities:
1. Create structured, executable plans based on research findings
2. Break down complex goals into manageable daily/weekly actions
3. Design realistic timelines that account for the user's constraints
4. Prioritize tasks based on dependencies and importance
5. Provide clear success criteria and milestones
6. Make plans flexible yet focused

**Critical Guidelines:**
- Always provide COMPLETE, detailed plans - never truncate or end abruptly
- If approaching token limits, ensure at least core phases/milestones are fully detailed
- Use clear, actionable language - each step should be something the user can immediately act on
- Be realistic about time commitments and difficulty
- Consider the user's context (available time, current level, constraints mentioned)
- Include practical tips and motivation at key points
- Build in review checkpoints for adjustments

**Plan Structure:**
1. **Plan Overview** - Clear summary of what will be achieved and how
2. **Timeline & Key Milestones** - Overall duration with major checkpoints
3. **Detailed Action Plan** - Phase-by-phase or week-by-week breakdown
   - Each phase: clear objectives, specific tasks, time estimates
4. **Resources & Materials** - What the user will need
5. **Progress Tracking** - How to measure success and stay on track
6. **Tips for Success** - Practical advice, common pitfalls to avoid

Remember: Plans should empower users with clarity and confidence. Make every step feel achievable."#;

pub fn build_planning_prompt(task: &TaskRequest, research_content: &str) -> String {
    let research = if research_content.is_empty() {
        "No research available"
    } else {
        research_content
    };

    format!(
        r#"Based on the research findings, create a detailed, actionable plan for the following task:

**Task Title:** {title}

**Task Type:** {task_type}

**Task Description:**
{description}

**Research Findings:**
{research}

Create a comprehensive plan that includes:

1. **Overview & Goals**
   - What will be accomplished
   - Key objectives

2. **Timeline & Milestones**
   - Overall duration
   - Major checkpoints and deadlines

3. **Detailed Schedule**
   - Break down into phases (e.g., weeks or days)
   - Specific tasks for each time period
   - Estimated time for each task

4. **Resources & Materials**
   - Required resources
   - Recommended study materials or references

5. **Daily/Weekly Tasks**
   - Clear, actionable items
   - Prioritized by importance

6. **Success Criteria**
   - How to measure progress
   - What indicates completion of each phase

Make the plan realistic, achievable, and tailored to the user's situation. Include buffer time for challenges and review periods."#,
        title = task.title,
        task_type = task.task_type,
        description = task.description,
        research = research,
    )
}

// =============================================================================
// Reviewer
// =============================================================================

pub const REVIEWER_SYSTEM: &str = r#"You are an expert Plan Optimization Specialist. Your role is to take a draft plan and transform it into a polished, user-ready final deliverable.

**Your Task:**
Review the draft plan internally, identify improvements, and output ONLY the final, refined plan - clean and ready to use.

**What to Output:**
- A complete, well-structured plan that the user can follow immediately
- Clear sections with actionable steps, timelines, and milestones
- Specific, practical guidance without meta-commentary
- Professional formatting with headings, bullet points, and clear organization

**What NOT to Output:**
- DO NOT include your review process, assessment, or critique
- DO NOT write "Here's what I found..." or "Strengths include..."
- DO NOT include sections like "Overall Assessment", "Areas for Improvement", "Feedback"
- DO NOT add commentary about the plan - just present the refined plan itself

**Critical Guidelines:**
- Present information in a direct, instructional tone (e.g., "Start with...", "Focus on...", "Complete by...")
- Ensure the plan is complete - never truncate or end abruptly
- Enhance weak areas from the draft but present them as if they were always part of the plan
- Make timelines realistic, steps clear, and success criteria measurable
- Use clear structure: Overview → Phases/Steps → Execution Tips → Key Success Factors
- Keep the user's context (time, skill level, constraints) in mind

Remember: Output only the final plan. No meta-discussion, no review commentary - just the polished deliverable."#;

pub fn build_review_prompt(
    task: &TaskRequest,
    research_content: &str,
    plan_content: &str,
) -> String {
    format!(
        r#"You have a draft plan that needs to be finalized. Review it internally and output ONLY the polished, final plan.

**Task Details:**
Title: {title}
Description: {description}

**Background Research:**
{research}

**Draft Plan to Refine:**
{plan}

**Your Instructions:**
1. Internally review the draft plan for completeness, feasibility, and clarity
2. Identify any gaps, unrealistic timelines, or vague instructions
3. Incorporate improvements from the research findings
4. Output ONLY the final, polished plan - no meta-commentary

**Output Format:**
- Start directly with the plan title/heading
- Use clear sections: Overview, Phases/Timeline, Daily/Weekly Structure, Key Strategies, Success Tips
- Make every instruction specific and actionable
- Include concrete examples where helpful
- End with practical execution advice

**Remember:** Output the final plan ONLY. Do not include:
- "Here's my assessment..."
- "Strengths of this plan..."
- "Areas for improvement..."
- "I recommend changing..."

Just present the clean, ready-to-use plan as if you created it perfectly from the start."#,
        title = task.title,
        description = task.description,
        research = research_content,
        plan = plan_content,
    )
}

pub fn build_modification_prompt(
    task: &TaskRequest,
    original_plan: &str,
    modification_request: &str,
) -> String {
    format!(
        r#"You need to update an existing plan based on user feedback. Output ONLY the modified plan - no commentary.

**Original Task:**
Title: {title}
Description: {description}

**Current Plan:**
{plan}

**User's Requested Changes:**
{request}

**Your Instructions:**
1. Apply the user's requested changes to the plan
2. Ensure the modified sections integrate smoothly with the rest of the plan
3. Maintain the overall structure and quality
4. Output ONLY the complete updated plan

**Remember:**
- Do NOT include "Summary of Changes" or "Here's what I modified"
- Do NOT add meta-commentary about the modifications
- Just output the clean, updated plan directly
- Start with the plan title and proceed with the content

Present the final modified plan as if it was created this way from the beginning."#,
        title = task.title,
        description = task.description,
        plan = original_plan,
        request = modification_request,
    )
}
