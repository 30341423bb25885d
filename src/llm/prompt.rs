use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    CodeGeneration,
    Guidance,
    TestCases,
}

impl TaskKind {
    /// System instruction sent alongside the prompt. Code generation relies
    /// on the prompt alone.
    pub fn system_prompt(&self) -> Option<&'static str> {
        match self {
            TaskKind::CodeGeneration => None,
            TaskKind::Guidance => Some(GUIDANCE_SYSTEM_PROMPT),
            TaskKind::TestCases => Some(TEST_CASES_SYSTEM_PROMPT),
        }
    }

    pub fn expects_json(&self) -> bool {
        matches!(self, TaskKind::CodeGeneration)
    }
}

/// User-supplied context for one task. Built fresh per action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRequest {
    pub task: TaskKind,
    pub language_type: String,
    pub hardware_name: String,
    pub application_description: String,
    pub existing_code: String,
}

impl PromptRequest {
    pub fn new(
        task: TaskKind,
        language_type: impl Into<String>,
        hardware_name: impl Into<String>,
        application_description: impl Into<String>,
        existing_code: impl Into<String>,
    ) -> Self {
        Self {
            task,
            language_type: language_type.into(),
            hardware_name: hardware_name.into(),
            application_description: application_description.into(),
            existing_code: existing_code.into(),
        }
    }

    /// Same context, different task. Used to feed guidance and test cases
    /// from a previous code-generation result.
    pub fn for_task(&self, task: TaskKind) -> Self {
        Self { task, ..self.clone() }
    }

    pub fn with_existing_code(mut self, code: impl Into<String>) -> Self {
        self.existing_code = code.into();
        self
    }
}

const GUIDANCE_SYSTEM_PROMPT: &str = "You are a helpful assistant. Your task is to act as an embedded systems development expert with extensive experience in embedded hardware and firmware design. Analyze the provided code and suggest step-by-step guidance for further development and improvement in markdown format.";

const TEST_CASES_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that provides test cases in Markdown format.";

const CODE_GENERATION_TEMPLATE: &str = r#"Act as a Senior Embedded Systems Architect and Code Generation Specialist with expertise in {{language}} and {{hardware}} development.

Primary Objective:
Generate production-ready, optimized embedded software code that adheres to industry best practices, considering:
1. Hardware-specific constraints
2. Resource optimization
3. Real-time performance requirements
4. Safety and reliability standards

DETAILED CODE GENERATION INSTRUCTIONS:

Input Parameters:
- Programming Language: {{language}}
- Target Hardware Platform: {{hardware}}
- Specific Requirements: {{app_description}}
- Optional Code Context/Existing Fragments: {{code}}

Code Generation Methodology:
1. Architecture Analysis
- Examine the hardware specifications
- Identify hardware-specific limitations
- Determine the optimal memory management strategy
- Assess real-time processing requirements

2. Code Generation Principles:
- Prioritize memory efficiency
- Minimize computational complexity
- Implement robust error handling
- Ensure deterministic behavior
- Follow the target hardware's architectural constraints

3. Output Specifications:
a) Produce complete, compilable code
b) Include comments explaining complex logic
c) Provide modular, reusable component design
d) Implement appropriate abstraction layers

4. Non-Negotiable Requirements:
- Zero memory leaks
- Minimal heap usage
- Predictable execution time
- Clear separation of concerns
- Platform-specific optimization techniques

5. Additional Contextual Considerations:
- Interrupt handling mechanisms
- Power consumption optimization
- Communication protocol implementations
- Real-time scheduling requirements

Constraint Validation Checklist:
a) Compile-time memory footprint
b) Runtime performance metrics
c) Interrupt latency
d) Power consumption profile
e) Thermal management considerations

Deliverables:
- Complete source code
- Inline documentation
- Recommended compilation flags
- Hardware-specific optimization recommendations

GENERATE CODE STRICTLY ADHERING TO:
- Hardware manufacturer's recommendations
- Real-time systems best practices

Output Format:
Respond with a single JSON object containing exactly these keys and nothing else:
{
    "source_code": "Complete source code here",
    "documentation": "Comprehensive documentation",
    "optimization_recommendations": ["Recommendation 1", "Recommendation 2"]
}
"source_code" and "documentation" are strings; "optimization_recommendations" is an array of strings.
"#;

const GUIDANCE_TEMPLATE: &str = r#"Act as an embedded systems development expert with extensive experience in embedded hardware and firmware design. Your task is to analyze the provided code and suggest **step-by-step guidance** for further development and improvement.

Your output should be a markdown table with the following columns:
    - **Column A:** Improvement Area
    - **Column B:** Identified Issue or Current State of Code
    - **Column C:** Suggested Next Steps or Actions

Ensure that your suggestions include:
1. **Performance Optimization** for resource-constrained environments.
2. **Error Handling Enhancements** to improve reliability and fault tolerance.
3. **Code Maintainability Improvements** for better readability, modularity, and scalability.
4. **Utilization of Hardware-Specific Features** for improved functionality.
5. **Future Development Recommendations** for extending device capabilities.

Below is the provided code for analysis:
{{code}}

Below is the programming language in use:
{{language}}

Below is the target hardware:
{{hardware}}

Below is the application description:
{{app_description}}

YOUR RESPONSE (do not wrap in a code block):
"#;

const TEST_CASES_TEMPLATE: &str = r#"Act as an expert in embedded systems development and testing with more than 20 years of experience.
Your task is to generate test cases for running embedded application code in order to identify potential issues such as
memory allocation errors, CPU utilization problems, system crashes, or other runtime errors. The test cases should
focus on verifying the stability and efficiency of the embedded system. Write the test cases for a test framework specific to the language.

### Application Details:
- **Programming Language:** {{language}}
- **Hardware/Platform:** {{hardware}}
- **Application Code:** {{code}}
- **Application Description:** {{app_description}}

Put each test case inside triple backticks (```) so the test cases are formatted as Markdown. Add a title for each test case and write language-specific test cases.
For example:

    ```Test Case
    Given a scenario where the system is under heavy load
    When the system is running multiple processes
    Then the system should not crash and should maintain stable performance
    ```

YOUR RESPONSE (do not add introductory text, just provide the test cases):
"#;

/// Fill `{{name}}` placeholders in one pass over the template. Values are
/// inserted verbatim and never rescanned, so user text containing `{{...}}`
/// survives untouched. Unknown placeholders are left as they are.
fn render_template(template: &str, variables: &[(&str, &str)]) -> String {
    let extra: usize = variables.iter().map(|(_, value)| value.len()).sum();
    let mut rendered = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        rendered.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];

        let Some(end) = after_open.find("}}") else {
            rendered.push_str(&rest[start..]);
            return rendered;
        };

        let name = &after_open[..end];
        match variables.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => rendered.push_str(value),
            None => rendered.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after_open[end + 2..];
    }

    rendered.push_str(rest);
    rendered
}

pub fn build_code_generation_prompt(
    language_type: &str,
    hardware_name: &str,
    app_description: &str,
    existing_code: &str,
) -> String {
    render_template(
        CODE_GENERATION_TEMPLATE,
        &[
            ("language", language_type),
            ("hardware", hardware_name),
            ("app_description", app_description),
            ("code", existing_code),
        ],
    )
}

pub fn build_guidance_prompt(code: &str, language: &str, hardware: &str, app_description: &str) -> String {
    render_template(
        GUIDANCE_TEMPLATE,
        &[
            ("code", code),
            ("language", language),
            ("hardware", hardware),
            ("app_description", app_description),
        ],
    )
}

pub fn build_test_cases_prompt(code: &str, language: &str, hardware: &str, app_description: &str) -> String {
    render_template(
        TEST_CASES_TEMPLATE,
        &[
            ("code", code),
            ("language", language),
            ("hardware", hardware),
            ("app_description", app_description),
        ],
    )
}

/// Dispatch on the request's task kind.
pub fn build_prompt(request: &PromptRequest) -> String {
    match request.task {
        TaskKind::CodeGeneration => build_code_generation_prompt(
            &request.language_type,
            &request.hardware_name,
            &request.application_description,
            &request.existing_code,
        ),
        TaskKind::Guidance => build_guidance_prompt(
            &request.existing_code,
            &request.language_type,
            &request.hardware_name,
            &request.application_description,
        ),
        TaskKind::TestCases => build_test_cases_prompt(
            &request.existing_code,
            &request.language_type,
            &request.hardware_name,
            &request.application_description,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANGUAGE: &str = "Embedded C";
    const HARDWARE: &str = "STM32F407";
    const DESCRIPTION: &str = "Blink PA5 at 2 Hz using TIM2 interrupts";
    const CODE: &str = "void TIM2_IRQHandler(void) { GPIOA->ODR ^= (1U << 5); }";

    fn all_prompts(language: &str, hardware: &str, description: &str, code: &str) -> Vec<String> {
        vec![
            build_code_generation_prompt(language, hardware, description, code),
            build_guidance_prompt(code, language, hardware, description),
            build_test_cases_prompt(code, language, hardware, description),
        ]
    }

    #[test]
    fn test_prompts_embed_every_input() {
        for prompt in all_prompts(LANGUAGE, HARDWARE, DESCRIPTION, CODE) {
            assert!(prompt.contains(LANGUAGE));
            assert!(prompt.contains(HARDWARE));
            assert!(prompt.contains(DESCRIPTION));
            assert!(prompt.contains(CODE));
            assert!(!prompt.contains("{{"));
        }
    }

    #[test]
    fn test_empty_inputs_are_legal() {
        for prompt in all_prompts("Rust", "nRF52840", "", "") {
            assert!(prompt.contains("Rust"));
            assert!(prompt.contains("nRF52840"));
            assert!(!prompt.contains("{{"));
        }
    }

    #[test]
    fn test_inputs_with_placeholders_are_verbatim() {
        let tricky_code = "printf(\"{{hardware}} {}\\n\", x); /* }} {{ */";
        let tricky_description = "template with {{code}} inside";

        for prompt in all_prompts(LANGUAGE, HARDWARE, tricky_description, tricky_code) {
            assert!(prompt.contains(tricky_code));
            assert!(prompt.contains(tricky_description));
        }
    }

    #[test]
    fn test_code_generation_prompt_demands_json_keys() {
        let prompt = build_code_generation_prompt(LANGUAGE, HARDWARE, DESCRIPTION, CODE);
        assert!(prompt.contains("\"source_code\""));
        assert!(prompt.contains("\"documentation\""));
        assert!(prompt.contains("\"optimization_recommendations\""));
    }

    #[test]
    fn test_guidance_prompt_structure() {
        let prompt = build_guidance_prompt(CODE, LANGUAGE, HARDWARE, DESCRIPTION);
        assert!(prompt.contains("Improvement Area"));
        assert!(prompt.contains("Identified Issue"));
        assert!(prompt.contains("Suggested Next Steps"));
        for topic in [
            "Performance Optimization",
            "Error Handling",
            "Maintainability",
            "Hardware-Specific Features",
            "Future Development",
        ] {
            assert!(prompt.contains(topic), "missing topic {}", topic);
        }
    }

    #[test]
    fn test_test_cases_prompt_forbids_intro() {
        let prompt = build_test_cases_prompt(CODE, LANGUAGE, HARDWARE, DESCRIPTION);
        assert!(prompt.contains("```"));
        assert!(prompt.contains("do not add introductory text"));
    }

    #[test]
    fn test_build_prompt_dispatch() {
        let request = PromptRequest::new(TaskKind::CodeGeneration, LANGUAGE, HARDWARE, DESCRIPTION, CODE);
        assert_eq!(
            build_prompt(&request),
            build_code_generation_prompt(LANGUAGE, HARDWARE, DESCRIPTION, CODE)
        );

        let guidance = request.for_task(TaskKind::Guidance);
        assert_eq!(guidance.language_type, LANGUAGE);
        assert_eq!(
            build_prompt(&guidance),
            build_guidance_prompt(CODE, LANGUAGE, HARDWARE, DESCRIPTION)
        );

        let tests = request.for_task(TaskKind::TestCases);
        assert_eq!(
            build_prompt(&tests),
            build_test_cases_prompt(CODE, LANGUAGE, HARDWARE, DESCRIPTION)
        );
    }

    #[test]
    fn test_prompts_are_deterministic() {
        assert_eq!(
            build_guidance_prompt(CODE, LANGUAGE, HARDWARE, DESCRIPTION),
            build_guidance_prompt(CODE, LANGUAGE, HARDWARE, DESCRIPTION)
        );
    }

    #[test]
    fn test_render_template_edge_cases() {
        assert_eq!(render_template("{{a}}{{b}}", &[("a", "1"), ("b", "2")]), "12");
        assert_eq!(render_template("keep {{unknown}}", &[]), "keep {{unknown}}");
        assert_eq!(render_template("open {{ only", &[]), "open {{ only");
        assert_eq!(render_template("no placeholders", &[("a", "1")]), "no placeholders");
    }

    #[test]
    fn test_system_prompts() {
        assert!(TaskKind::CodeGeneration.system_prompt().is_none());
        assert!(TaskKind::Guidance.system_prompt().unwrap().contains("embedded systems"));
        assert!(TaskKind::TestCases.system_prompt().unwrap().contains("Markdown"));
        assert!(TaskKind::CodeGeneration.expects_json());
        assert!(!TaskKind::Guidance.expects_json());
    }
}
