//! Tests for the PRISM parser

#[cfg(test)]
mod test_prism_parser {
    use std::fs;

    use pmc_model::{
        ModelType,
        expressions::{Expression, Identifier},
        program::{ProgramModelType, RewardItem, VariableType},
    };
    use pmc_parser::{
        ParseProgram, parse_prism_program,
        prism::{PrismParser, parse_constant_definitions},
    };
    use walkdir::WalkDir;

    const EXAMPLES_FOLDER: &str = "../../resources/examples";

    fn example(path: &str) -> String {
        format!("{EXAMPLES_FOLDER}/{path}")
    }

    #[test]
    fn test_brp() {
        let program = parse_prism_program(example("pdtmc/brp16_2.pm")).unwrap();

        assert_eq!(program.model_type(), ProgramModelType::Dtmc);
        assert_eq!(
            program.model_type().sparse_model_type(),
            Some(ModelType::Dtmc)
        );
        assert_eq!(program.nr_modules(), 5);
        assert!(program.has_undefined_constants());

        let undefined = program
            .undefined_constants()
            .map(|c| c.name().name())
            .collect::<Vec<_>>();
        assert_eq!(undefined, vec!["pL", "pK"]);

        assert!(program.module("channelK").is_some());
        assert_eq!(program.labels()[0].name(), "target");
        assert!(matches!(
            program.reward_structures()[0].items()[0],
            RewardItem::Transition { .. }
        ));
    }

    #[test]
    fn test_brp_with_defined_constants() {
        let program = parse_prism_program(example("pdtmc/brp16_2.pm")).unwrap();
        let definitions = parse_constant_definitions("pL=0.98,pK=0.99").unwrap();

        let program = program.define_constants(&definitions).unwrap();
        assert!(!program.has_undefined_constants());
    }

    #[test]
    fn test_die() {
        let program = parse_prism_program(example("dtmc/die.pm")).unwrap();

        assert_eq!(program.model_type(), ProgramModelType::Dtmc);
        assert_eq!(program.nr_modules(), 1);
        assert!(!program.has_undefined_constants());
        assert_eq!(program.labels().len(), 7);
        assert_eq!(program.modules()[0].commands().len(), 8);
    }

    #[test]
    fn test_two_dice() {
        let program = parse_prism_program(example("mdp/two_dice.nm")).unwrap();

        assert_eq!(program.model_type(), ProgramModelType::Mdp);
        assert_eq!(program.nr_modules(), 2);

        let die2 = program.module("die2").unwrap();
        let names = die2
            .variables()
            .iter()
            .map(|v| v.name().clone())
            .collect::<Vec<_>>();
        assert_eq!(names, vec![Identifier::new("s2"), Identifier::new("d2")]);
        assert_eq!(
            die2.variables()[0].variable_type(),
            &VariableType::Bounded {
                lower: Expression::Int(0),
                upper: Expression::Int(7)
            }
        );
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let input = fs::read_to_string(example("pdtmc/brp16_2.pm")).unwrap();

        let first = PrismParser::new().parse_program(&input).unwrap();
        let second = PrismParser::new().parse_program(&input).unwrap();
        assert_eq!(first, second);

        let reparsed = PrismParser::new()
            .parse_program(&first.to_string())
            .unwrap();
        assert_eq!(first, reparsed);
    }

    #[test]
    fn test_all_examples_can_be_parsed() {
        for entry in WalkDir::new(EXAMPLES_FOLDER)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let f_name = entry.file_name().to_string_lossy();

            if f_name.ends_with(".pm") || f_name.ends_with(".nm") {
                println!("Checking file {f_name}");

                parse_prism_program(entry.path()).unwrap_or_else(|err| {
                    panic!(
                        "Failed to parse program from file {}: {err:?}",
                        entry.path().display()
                    )
                });
            }
        }
    }
}
