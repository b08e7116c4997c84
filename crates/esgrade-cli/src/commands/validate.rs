use crate::support::{print_json_or_exit, read_json_or_exit};
use esgrade_kernel::{PolicyTag, ValidationDefect, validate_lenient};
use serde::Serialize;
use std::path::PathBuf;

const VALIDATION_KIND: &str = "esgrade.validation.v1";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationOutput {
    schema: u32,
    validation_kind: &'static str,
    input: String,
    result: &'static str,
    fatal: bool,
    defects: Vec<ValidationDefect>,
    policy_tags: Vec<PolicyTag>,
    invalid_paths: Vec<String>,
}

pub fn run(input: String, json_output: bool) {
    let raw = read_json_or_exit(&PathBuf::from(&input), "record");
    let validation = validate_lenient(&raw);

    let output = ValidationOutput {
        schema: 1,
        validation_kind: VALIDATION_KIND,
        input,
        result: if validation.is_clean() {
            "valid"
        } else {
            "invalid"
        },
        fatal: validation.is_fatal(),
        invalid_paths: validation.invalid_values.keys().cloned().collect(),
        defects: validation.defects,
        policy_tags: validation.policy_tags,
    };

    if json_output {
        print_json_or_exit(&output, "validation");
    } else {
        print_human_summary(&output);
    }

    if !output.defects.is_empty() {
        std::process::exit(1);
    }
}

fn print_human_summary(output: &ValidationOutput) {
    println!("esgrade validate");
    println!("  Input: {}", output.input);
    println!("  Result: {}", output.result);
    if output.fatal {
        println!("  Fatal: record cannot be read");
    }
    if !output.policy_tags.is_empty() {
        println!("  Policy tags:");
        for tag in &output.policy_tags {
            println!("    - {}: {}", tag.phrase, tag.value);
        }
    }
    if !output.defects.is_empty() {
        println!("  Defects ({}):", output.defects.len());
        for defect in &output.defects {
            println!("    - {defect}");
        }
    }
}
