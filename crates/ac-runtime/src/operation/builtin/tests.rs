use super::*;
use crate::module::OperationModule;
use crate::operation::OperationResponse;
use crate::user::ApplicationUser;

fn run(line: &str) -> OperationResponse {
    let module = OperationModule::new();
    module.execute_line(&Rc::new(ApplicationUser::console()), line)
}

fn failure(line: &str) -> Vec<String> {
    let response = run(line);
    assert!(!response.succeeded, "{} should fail", line);
    response.messages
}

#[test]
fn builtin_names_are_unique() {
    let templates = builtin_templates();
    let mut keys: Vec<&str> = templates.iter().map(OperationTemplate::key).collect();
    keys.sort_unstable();
    keys.dedup();
    assert_eq!(keys.len(), 13);
}

#[test]
fn comparison_reads_left_operator_right() {
    assert!(run("operation comparison left=5 operator=greater right=3").succeeded);
    assert!(run("operation comparison left=10 operator=> right=9").succeeded);
    assert!(!run("operation comparison left=2 operator=less_than right=1").succeeded);
    assert_eq!(
        failure("operation comparison left=abc operator=== right=abc"),
        vec!["Incorrect variable mapping: operator===. Mapping should be: 'key=value'."]
    );
    assert!(run("operation comparison left=abc operator=equal right=abc").succeeded);
}

#[test]
fn comparison_requires_operands() {
    let messages = failure("operation comparison operator=equal right=1");
    assert_eq!(
        messages,
        vec!["An error occurred when executing this operation: Missing value at: 'left'"]
    );
}

#[test]
fn element_of_compares_sizes_and_members() {
    assert!(run("operation element-of left=b operator=less right=a,b,c").succeeded);
    assert!(run("operation element-of left=b operator=less_or_equal right=a,b,c").succeeded);
    assert!(!run("operation element-of left=b operator=equal right=a,b,c").succeeded);
    assert!(run("operation element-of left=b operator=equal right=b").succeeded);
    assert!(!run("operation element-of left=d operator=less right=a,b,c").succeeded);
    assert!(run("operation element-of left=d operator=less right=a,b,c inverted=true").succeeded);
}

#[test]
fn info_describes_resolved_targets() {
    let response = run("operation info target=.operations.info");
    assert_eq!(response.messages, vec!["Operation: info"]);
    let response = run("operation info target=info registry=operations");
    assert_eq!(response.messages, vec!["Operation: info"]);
    let messages = failure("operation info target=nothing registry=operations");
    assert_eq!(
        messages,
        vec!["An error occurred when executing this operation: Could not find value for key nothing in registry operations"]
    );
}

#[test]
fn data_info_lists_filtered_entries() {
    let response = run("operation data-info target=.operations key-filters=size,int");
    assert!(response.succeeded);
    assert_eq!(
        response.messages,
        vec!["Registry: Operations", "int-size: int-size"]
    );
    let messages = failure("operation data-info target=info registry=operations");
    assert_eq!(
        messages,
        vec!["An error occurred when executing this operation: Operation: info does not hold any data."]
    );
}

#[test]
fn filter_allows_and_blocks() {
    assert!(run("operation filter target=red allowed-values=red,green").succeeded);
    assert_eq!(
        failure("operation filter target=blue allowed-values=red,green"),
        vec!["blue is not allowed.", "Allowed values: red, green"]
    );
    assert_eq!(
        failure("operation filter target=red blocked-values=red"),
        vec!["red is not allowed."]
    );
    assert!(run("operation filter target=7 type=int allowed-values=5,6,7").succeeded);
    assert_eq!(
        failure("operation filter target=red"),
        vec!["An error occurred when executing this operation: allowed-values and blocked-values are both empty"]
    );
}

#[test]
fn string_length_needs_consistent_bounds() {
    assert!(run("operation string-length target=abc min-length=2 max-length=3").succeeded);
    assert_eq!(
        failure("operation string-length target=a min-length=2"),
        vec!["Input must be at least 2 characters long."]
    );
    assert_eq!(
        failure("operation string-length target=abc"),
        vec!["An error occurred when executing this operation: Neither min-length nor max-length is set."]
    );
    assert_eq!(
        failure("operation string-length target=abc min-length=4 max-length=2"),
        vec!["An error occurred when executing this operation: Max length is smaller than min length. (min: 4 max: 2)"]
    );
}

#[test]
fn text_checks_pass_on_valid_input() {
    assert!(run("operation string-only-ascii target=plain").succeeded);
    assert_eq!(
        failure("operation string-only-ascii target=café"),
        vec!["Input cannot contain non-ASCII characters."]
    );
    assert!(run("operation string-only-letters target=letters").succeeded);
    assert_eq!(
        failure("operation string-only-letters target=abc1"),
        vec!["Input cannot contain non-alphabetical characters."]
    );
}

#[test]
fn number_sizes_respect_bounds() {
    assert!(run("operation int-size target=5 min-size=1 max-size=10").succeeded);
    assert_eq!(
        failure("operation int-size target=12 max-size=10"),
        vec!["Input cannot be higher than 10."]
    );
    assert_eq!(
        failure("operation long-size target=-3 min-size=0"),
        vec!["Input cannot be lower than 0."]
    );
    let messages = failure("operation double-size target=1.5 min-size=2");
    assert!(messages[0].starts_with("Input cannot be lower than 2"));
    assert!(run("operation decimal-size target=2.5 max-size=3").succeeded);
    let messages = failure("operation int-size target=abc max-size=3");
    assert!(messages[0].contains("could not be converted to type: int"));
    assert_eq!(
        failure("operation int-size target=3"),
        vec!["An error occurred when executing this operation: Neither min-size nor max-size is set."]
    );
}

#[test]
fn collection_size_counts_elements() {
    assert!(run("operation collection-size target=a,b min-size=2").succeeded);
    assert_eq!(
        failure("operation collection-size target=a,b,c max-size=2"),
        vec!["Input cannot have more than 2 elements."]
    );
    assert_eq!(
        failure("operation collection-size target=a min-size=2"),
        vec!["Input must have at least 2 elements."]
    );
}

#[test]
fn response_settings_shape_output() {
    assert_eq!(
        failure("operation string-length target=abc max-length=2 error-message=nope"),
        vec!["nope"]
    );
    assert!(failure("operation string-length target=abc max-length=2 report-errors=false").is_empty());
    let response = run("operation string-length target=ab max-length=2 success-message=fine");
    assert_eq!(response.messages, vec!["fine"]);
}
