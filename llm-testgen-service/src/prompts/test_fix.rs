//! Prompt for repairing a failing generated test.

use std::fmt::Write;

use crate::model::ChatMessage;
use crate::prompts::TestFramework;

/// Inputs for one test-fix prompt.
#[derive(Debug)]
pub struct TestFixContext<'a> {
    pub test_code: &'a str,
    pub error_message: &'a str,
    pub test_output: Option<&'a str>,
    /// The function being tested, for reference.
    pub original_code: &'a str,
    pub framework: TestFramework,
    /// 1-based attempt counter.
    pub attempt: u32,
    pub max_attempts: u32,
}

/// Builds the system + user message pair for a fix attempt.
pub fn build_test_fix_prompt(ctx: &TestFixContext<'_>) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(build_system_prompt(ctx)),
        ChatMessage::user(build_user_prompt(ctx)),
    ]
}

fn build_system_prompt(ctx: &TestFixContext<'_>) -> String {
    let name = ctx.framework.name();
    format!(
        "You are an expert {name} test debugger. Your task is to fix failing unit tests.\n\
\n\
Context:\n\
- This is fix attempt {} of {}\n\
- The test code failed to run or produced incorrect results\n\
- You need to analyze the error and fix the test code\n\
\n\
Requirements:\n\
1. Fix the test code to make it pass\n\
2. Maintain the original test intent\n\
3. Use proper {name} syntax\n\
4. Ensure all imports and dependencies are correct\n\
5. Fix any syntax errors, type errors, or logical errors\n\
6. If the original code being tested has issues, note that but focus on fixing the test\n\
\n\
Output format:\n\
- Return ONLY the fixed test code, no explanations or markdown code blocks\n\
- The code should be complete and runnable\n\
- Include all necessary imports",
        ctx.attempt, ctx.max_attempts
    )
}

fn build_user_prompt(ctx: &TestFixContext<'_>) -> String {
    let mut prompt = String::new();

    let _ = write!(
        prompt,
        "The following {} test is failing. Fix it:\n\n\
Original function code:\n```typescript\n{}\n```\n\n\
Failing test code:\n```typescript\n{}\n```\n\n\
Error message:\n```\n{}\n```\n\n",
        ctx.framework.id(),
        ctx.original_code,
        ctx.test_code,
        ctx.error_message
    );

    if let Some(output) = ctx.test_output {
        let _ = write!(prompt, "Test output:\n```\n{output}\n```\n\n");
    }

    if ctx.attempt > 1 {
        let _ = write!(
            prompt,
            "Note: This is fix attempt {}. Previous attempts failed. Please analyze the error more carefully.\n\n",
            ctx.attempt
        );
    }

    prompt.push_str(
        "Fix the test code to resolve the error. Return ONLY the corrected test code, no explanations.",
    );
    prompt
}
