//! Prompt for generating fresh unit tests for one target function.

use std::fmt::Write;

use test_target_engine::TestTarget;

use crate::model::ChatMessage;
use crate::prompts::TestFramework;

/// A neighboring function shown to the model alongside the target.
#[derive(Debug, Clone, Copy)]
pub struct RelatedFunction<'a> {
    pub name: &'a str,
    pub code: &'a str,
}

/// Inputs for one test-generation prompt.
#[derive(Debug)]
pub struct TestGenerationContext<'a> {
    pub target: &'a TestTarget,
    pub framework: TestFramework,
    /// Content of the discovered existing test file, when there is one.
    pub existing_test_content: Option<&'a str>,
    /// Additional functions rendered for context; empty omits the section.
    pub related_functions: &'a [RelatedFunction<'a>],
}

/// Builds the system + user message pair for test generation.
pub fn build_test_generation_prompt(ctx: &TestGenerationContext<'_>) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(build_system_prompt(ctx.framework)),
        ChatMessage::user(build_user_prompt(ctx)),
    ]
}

fn build_system_prompt(framework: TestFramework) -> String {
    let name = framework.name();
    let import_statement = format!(
        "import {{ describe, it, expect }} from '{}';",
        framework.id()
    );

    format!(
        "You are an expert {name} test writer. Your task is to generate comprehensive unit tests for TypeScript/JavaScript functions.\n\
\n\
Requirements:\n\
1. Generate complete, runnable {name} test code\n\
2. Use {name} syntax and best practices\n\
3. Test edge cases, error conditions, and normal operation\n\
4. Use descriptive test names that explain what is being tested\n\
5. Include proper setup/teardown if needed\n\
6. Mock external dependencies appropriately\n\
7. Test both success and failure scenarios\n\
8. Follow the existing test file structure if one exists\n\
\n\
Output format:\n\
- Return ONLY the test code, no explanations or markdown code blocks\n\
- The code should be ready to run in a {name} environment\n\
- Include necessary imports at the top\n\
- Use proper TypeScript types if the source code uses TypeScript\n\
\n\
{name} example structure:\n\
{import_statement}\n\
\n\
describe('FunctionName', () => {{\n\
  it('should handle normal case', () => {{\n\
    // test implementation\n\
  }});\n\
\n\
  it('should handle edge case', () => {{\n\
    // test implementation\n\
  }});\n\
}});"
    )
}

fn build_user_prompt(ctx: &TestGenerationContext<'_>) -> String {
    let target = ctx.target;
    let framework = ctx.framework.id();
    let mut prompt = String::new();

    let _ = write!(
        prompt,
        "Generate {framework} unit tests for the following function:\n\n\
File: {}\nFunction: {}\nType: {}\n\n\
Function code:\n```typescript\n{}\n```\n\n",
        target.file_path, target.function_name, target.function_type, target.code
    );

    if !target.context.is_empty() {
        let _ = write!(
            prompt,
            "Context (surrounding code):\n```typescript\n{}\n```\n\n",
            target.context
        );
    }

    if !ctx.related_functions.is_empty() {
        prompt.push_str("Related functions (for context):\n");
        for related in ctx.related_functions {
            let _ = write!(
                prompt,
                "\n{}:\n```typescript\n{}\n```\n",
                related.name, related.code
            );
        }
        prompt.push('\n');
    }

    if let Some(existing) = ctx.existing_test_content {
        let _ = write!(
            prompt,
            "Existing test file structure (follow this pattern):\n```typescript\n{existing}\n```\n\n\
Note: Add new tests to this file, maintaining the existing structure and style.\n\n"
        );
    }

    let _ = write!(
        prompt,
        "Generate comprehensive unit tests for {}. Include:\n\
- Tests for normal operation with various inputs\n\
- Tests for edge cases (null, undefined, empty arrays, etc.)\n\
- Tests for error conditions if applicable\n\
- Tests for boundary conditions\n\
- Proper mocking of dependencies if needed\n\n\
Return ONLY the test code, no explanations or markdown formatting.",
        target.function_name
    );

    prompt
}
