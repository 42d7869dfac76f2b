//! Offline scoring harness: score one recorded answer from the command line.
//!
//! Uses the hashing embedder and the JSON linear regressor so it runs with
//! no model downloads; production deployments swap in the `onnx` backends.

fn main() {
    if let Err(e) = run() {
        eprintln!("score_answer failed: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    use std::path::PathBuf;

    use viva_core::embed::stub::HashEmbedder;
    use viva_core::inference::linear::{uniform_model_file, LinearModel};
    use viva_core::{
        AnswerSession, EmbedderHandle, EngineConfig, ModelHandle, QuestionContext,
        QuestionGenerator, ScoringEngine, Submission, TailQuestion, Transcript, Waveform,
    };

    #[derive(Debug)]
    struct Args {
        wav: PathBuf,
        transcript: PathBuf,
        question: String,
        model_answer: String,
        model: Option<PathBuf>,
        threshold: Option<f32>,
        output: Option<PathBuf>,
    }

    fn parse_args() -> Result<Args, String> {
        let mut wav: Option<PathBuf> = None;
        let mut transcript: Option<PathBuf> = None;
        let mut question = String::new();
        let mut model_answer = String::new();
        let mut model: Option<PathBuf> = None;
        let mut threshold: Option<f32> = None;
        let mut output: Option<PathBuf> = None;

        let mut it = std::env::args().skip(1);
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "--wav" => {
                    let Some(v) = it.next() else {
                        return Err("missing value for --wav".into());
                    };
                    wav = Some(PathBuf::from(v));
                }
                "--transcript" => {
                    let Some(v) = it.next() else {
                        return Err("missing value for --transcript".into());
                    };
                    transcript = Some(PathBuf::from(v));
                }
                "--question" => {
                    let Some(v) = it.next() else {
                        return Err("missing value for --question".into());
                    };
                    question = v;
                }
                "--model-answer" => {
                    let Some(v) = it.next() else {
                        return Err("missing value for --model-answer".into());
                    };
                    model_answer = v;
                }
                "--model" => {
                    let Some(v) = it.next() else {
                        return Err("missing value for --model".into());
                    };
                    model = Some(PathBuf::from(v));
                }
                "--threshold" => {
                    let Some(v) = it.next() else {
                        return Err("missing value for --threshold".into());
                    };
                    threshold = Some(
                        v.parse::<f32>()
                            .map_err(|_| "invalid value for --threshold".to_string())?
                            .clamp(0.0, 1.0),
                    );
                }
                "--output" => {
                    let Some(v) = it.next() else {
                        return Err("missing value for --output".into());
                    };
                    output = Some(PathBuf::from(v));
                }
                "--help" | "-h" => {
                    println!(
                        "Usage: cargo run -p viva-core --bin score_answer -- \\
  --wav <answer.wav> --transcript <answer.json|answer.txt> \\
  [--question <text>] [--model-answer <text>] \\
  [--model <weights.json>] [--threshold <0..1>] [--output <report.json>]"
                    );
                    std::process::exit(0);
                }
                other => {
                    return Err(format!("unknown argument: {other}"));
                }
            }
        }

        let wav = wav.ok_or("--wav is required")?;
        let transcript = transcript.ok_or("--transcript is required")?;
        Ok(Args {
            wav,
            transcript,
            question,
            model_answer,
            model,
            threshold,
            output,
        })
    }

    /// Fallback generator for offline runs: a fixed rephrase prompt instead
    /// of the LLM service.
    struct TemplateGenerator;

    impl QuestionGenerator for TemplateGenerator {
        fn generate(&mut self, ctx: &QuestionContext) -> viva_core::error::Result<TailQuestion> {
            Ok(TailQuestion {
                question: format!(
                    "Can you explain again, in your own words: {}",
                    if ctx.question.is_empty() {
                        "your answer"
                    } else {
                        ctx.question.as_str()
                    }
                ),
                model_answer: ctx.model_answer.clone(),
                explanation: "offline template follow-up".into(),
                difficulty: "medium".into(),
            })
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "viva=info".parse().unwrap()),
        )
        .init();

    let args = parse_args()?;

    let waveform = Waveform::from_wav_file(&args.wav).map_err(|e| e.to_string())?;

    let transcript_text =
        std::fs::read_to_string(&args.transcript).map_err(|e| e.to_string())?;
    let is_json = args
        .transcript
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let transcript: Transcript = if is_json {
        serde_json::from_str(&transcript_text).map_err(|e| e.to_string())?
    } else {
        Transcript::from_text(transcript_text.trim())
    };

    let model = match &args.model {
        Some(path) => LinearModel::from_path(path),
        // No fitted weights: score every answer 4.0 so the pipeline and
        // report shape can still be exercised end to end.
        None => LinearModel::from_file_contents(uniform_model_file(0.0, 4.0))
            .map_err(|e| e.to_string())?,
    };

    let mut config = EngineConfig::default();
    if let Some(threshold) = args.threshold {
        config.policy.threshold = threshold;
    }

    let engine = ScoringEngine::new(
        config,
        EmbedderHandle::new(HashEmbedder::default()),
        ModelHandle::new(model),
    );
    engine.warm_up().map_err(|e| e.to_string())?;

    let submission = Submission {
        waveform,
        transcript,
        question: args.question,
        model_answer: args.model_answer,
    };
    let mut session = AnswerSession::new();
    let report = engine
        .score_submission(&submission, &mut session, &mut TemplateGenerator)
        .map_err(|e| e.to_string())?;

    let json = report.to_json().map_err(|e| e.to_string())?;
    if let Some(out) = args.output {
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        std::fs::write(&out, &json).map_err(|e| e.to_string())?;
        println!("Wrote report: {}", out.display());
    } else {
        println!("{json}");
    }

    Ok(())
}
