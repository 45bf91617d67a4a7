//! Tests for the explicit model parser

#[cfg(test)]
mod test_explicit_parser {
    use std::{fs, path::Path};

    use pmc_model::{
        ModelType, SparseModel,
        builder::BuilderError,
        labeling::INITIAL_LABEL,
    };
    use pmc_parser::{
        ParseExplicitModel, explicit::ExplicitParser, parse_explicit_model,
        parse_explicit_model_with_rewards,
    };
    use walkdir::WalkDir;

    const EXAMPLES_FOLDER: &str = "../../resources/examples";

    fn example(path: &str) -> String {
        format!("{EXAMPLES_FOLDER}/{path}")
    }

    #[test]
    fn test_die() {
        let model = parse_explicit_model(example("dtmc/die.tra"), example("dtmc/die.lab")).unwrap();

        assert_eq!(model.model_type(), ModelType::Dtmc);
        assert_eq!(model.nr_states(), 13);
        assert_eq!(model.nr_transitions(), 20);
        assert!(!model.supports_parameters());
        assert!(model.as_dtmc().is_some());

        assert_eq!(model.initial_states().into_iter().collect::<Vec<_>>(), vec![0]);
        assert!(model.labels().contains(INITIAL_LABEL));
        assert!(model.labels_of_state(7).contains("one"));
        assert!(model.labels_of_state(12).contains("done"));
        assert!(model.labeling().states_with_label("deadlock").unwrap().is_empty());
    }

    #[test]
    fn test_two_dice() {
        let model = parse_explicit_model(
            example("mdp/two_dice.tra"),
            example("mdp/two_dice.lab"),
        )
        .unwrap();

        assert_eq!(model.model_type(), ModelType::Mdp);
        assert_eq!(model.nr_states(), 169);
        assert_eq!(model.nr_transitions(), 436);
        assert_eq!(model.nr_choices(), 254);
        assert!(!model.supports_parameters());

        let mdp = model.as_mdp().unwrap();
        assert_eq!(mdp.nr_choices_of_state(0), 2);
        assert_eq!(mdp.nr_choices_of_state(168), 2);
        assert_eq!(model.labeling().states_with_label("done").unwrap().len(), 36);
    }

    #[test]
    fn test_parametric_die() {
        let model = parse_explicit_model(example("pdtmc/die.tra"), example("pdtmc/die.lab")).unwrap();

        assert_eq!(model.model_type(), ModelType::Dtmc);
        assert_eq!(model.nr_states(), 13);
        assert_eq!(model.nr_transitions(), 20);
        assert!(model.supports_parameters());
        assert_eq!(model.probability_parameters().len(), 1);
    }

    #[test]
    fn test_die_with_rewards() {
        let model = parse_explicit_model_with_rewards(
            example("dtmc/die.tra"),
            example("dtmc/die.lab"),
            Some(Path::new(&example("dtmc/die.srew"))),
            None,
        )
        .unwrap();

        let rewards = model.reward_model().unwrap().state_rewards().unwrap();
        assert_eq!(rewards.len(), 13);
        assert_eq!(rewards.iter().sum::<f64>(), 7.0);
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let tra = example("dtmc/die.tra");
        let lab = example("dtmc/die.lab");

        let first = parse_explicit_model(&tra, &lab).unwrap();
        let second = parse_explicit_model(&tra, &lab).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_probability_mass() {
        let tra = fs::read_to_string(example("dtmc/die.tra"))
            .unwrap()
            .replace("0 2 0.5", "0 2 0.4");
        let lab = fs::read_to_string(example("dtmc/die.lab")).unwrap();

        let err = ExplicitParser::new().parse_model(&tra, &lab).unwrap_err();
        match err.downcast_ref::<BuilderError>() {
            Some(BuilderError::ProbabilityMass { state, choice, sum }) => {
                assert_eq!((*state, *choice), (0, 0));
                assert!((sum - 0.9).abs() < 1e-9);
            }
            _ => panic!("Expected a probability mass error, got: {err:?}"),
        }
    }

    #[test]
    fn test_missing_file() {
        assert!(parse_explicit_model(example("dtmc/none.tra"), example("dtmc/die.lab")).is_err());
    }

    #[test]
    fn test_all_examples_can_be_parsed() {
        for entry in WalkDir::new(EXAMPLES_FOLDER)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "tra") {
                println!("Checking file {}", path.display());

                let lab = path.with_extension("lab");
                parse_explicit_model(path, &lab).unwrap_or_else(|err| {
                    panic!("Failed to parse model from file {}: {err:?}", path.display())
                });
            }
        }
    }
}
