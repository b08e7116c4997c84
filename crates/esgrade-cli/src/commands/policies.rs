use crate::support::print_json_or_exit;
use esgrade_kernel::{PolicyInfo, PolicyKey, PolicyNormalization, PolicyTag, normalize_policies};

pub fn run(raw_tags: Vec<String>, json_output: bool) {
    let tags: Vec<PolicyTag> = raw_tags
        .iter()
        .map(|raw| {
            PolicyTag::parse(raw).unwrap_or_else(|| {
                eprintln!("error: invalid policy tag `{raw}` (expected `Phrase: true|false`)");
                std::process::exit(2);
            })
        })
        .collect();

    let normalization = normalize_policies(&PolicyInfo::default(), &tags);

    if json_output {
        print_json_or_exit(&normalization, "policy normalization");
    } else {
        print_human_summary(&normalization);
    }
}

fn print_human_summary(normalization: &PolicyNormalization) {
    println!("esgrade policies");
    println!("  Flags:");
    for key in PolicyKey::ALL {
        let value = match normalization.policies.get(key) {
            Some(flag) => flag.to_string(),
            None => "null".to_string(),
        };
        println!("    {key}: {value}");
    }
    if !normalization.hits.is_empty() {
        println!("  Resolved:");
        for hit in &normalization.hits {
            let suffix = if hit.applied { "" } else { " (ignored, already set)" };
            println!(
                "    - \"{}\" -> {} via \"{}\"{suffix}",
                hit.phrase, hit.key, hit.alias
            );
        }
    }
    if !normalization.unresolved.is_empty() {
        println!("  Unresolved: {}", normalization.unresolved.join(", "));
    }
}
