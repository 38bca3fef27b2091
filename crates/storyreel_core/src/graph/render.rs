//! Rendering of the typed graph into the engine's filter syntax.

use super::{Combine, FilterGraph, FilterStep, InputSpec, ZOOM_END};

/// The textual form of a graph, ready for the encode command.
#[derive(Debug, Clone)]
pub struct RenderedGraph {
    /// Complete `filter_complex` expression.
    pub filter_complex: String,
    /// Label of the stream to map into the output, including brackets.
    pub output_label: String,
}

impl InputSpec {
    /// Command arguments for this input, ahead of `-i <file>`.
    ///
    /// Looping the still for its duration at the output frame rate is
    /// what gives each scene a real per-frame timeline downstream.
    pub fn input_args(&self) -> Vec<String> {
        vec![
            "-loop".to_string(),
            "1".to_string(),
            "-t".to_string(),
            format!("{:.3}", self.duration_seconds),
            "-framerate".to_string(),
            self.frame_rate.to_string(),
        ]
    }
}

impl FilterGraph {
    /// Render the graph to filter text and resolve the output label.
    pub fn render(&self) -> RenderedGraph {
        let mut parts: Vec<String> = Vec::with_capacity(self.chains.len() + 1);

        for chain in &self.chains {
            let steps: Vec<String> = chain.steps.iter().map(render_step).collect();
            parts.push(format!(
                "[{}:v]{}[{}]",
                chain.input_index,
                steps.join(","),
                chain.label
            ));
        }

        let output_label = match &self.combine {
            Combine::Single => format!("[{}]", self.chains[0].label),
            Combine::Concat => {
                let heads: String = self
                    .chains
                    .iter()
                    .map(|c| format!("[{}]", c.label))
                    .collect();
                parts.push(format!(
                    "{heads}concat=n={}:v=1:a=0[vout]",
                    self.chains.len()
                ));
                "[vout]".to_string()
            }
            Combine::Crossfade {
                style,
                duration_seconds,
                offsets,
            } => {
                let mut prev = format!("[{}]", self.chains[0].label);
                let mut out = prev.clone();
                for (i, offset) in offsets.iter().enumerate() {
                    out = format!("[x{i}]");
                    parts.push(format!(
                        "{prev}[{}]xfade=transition={}:duration={:.3}:offset={:.3}{out}",
                        self.chains[i + 1].label,
                        style.filter_name(),
                        duration_seconds,
                        offset,
                    ));
                    prev = out.clone();
                }
                out
            }
        };

        RenderedGraph {
            filter_complex: parts.join(";"),
            output_label,
        }
    }
}

fn render_step(step: &FilterStep) -> String {
    match step {
        FilterStep::Scale { width, height } => format!("scale={width}:{height}"),
        FilterStep::ZoomPan {
            frames,
            width,
            height,
            frame_rate,
            pan,
        } => {
            let (hstep, vstep) = FilterGraph::pan_steps(*frames, *pan);
            format!(
                "zoompan=z='1+{delta:.4}*on/{frames}'\
                 :x='iw/2-(iw/zoom/2){hstep:+.4}*on'\
                 :y='ih/2-(ih/zoom/2){vstep:+.4}*on'\
                 :d=1:s={width}x{height}:fps={frame_rate},setsar=1",
                delta = ZOOM_END - 1.0,
            )
        }
        FilterStep::FitPad {
            width,
            height,
            frame_rate,
        } => format!(
            "scale={width}:{height}:force_original_aspect_ratio=decrease,\
             pad={width}:{height}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={frame_rate}"
        ),
        FilterStep::Grade(expr) => (*expr).to_string(),
        FilterStep::Trim { duration_seconds } => {
            format!("trim=duration={duration_seconds:.3},setpts=PTS-STARTPTS")
        }
    }
}
