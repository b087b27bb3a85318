use std::io::{self, Write};

use tch::{
    Tensor,
    nn::{Init, Path, VarStore},
};

use crate::error::{Error, Result};

/// Xavier/Glorot uniform init: U(-l, l) with l = sqrt(6 / (fan_in + fan_out)).
fn xavier_uniform(fan_in: i64, fan_out: i64) -> Init {
    let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
    Init::Uniform {
        lo: -limit,
        up: limit,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LinearConfig {
    pub bias: bool,
    /// Initial value of every bias entry.
    pub bias_start: f64,
}

impl Default for LinearConfig {
    fn default() -> Self {
        LinearConfig {
            bias: true,
            bias_start: 0.0,
        }
    }
}

/// Affine map over one or more 2D inputs: `concat(args, 1) @ matrix + bias`.
#[derive(Debug)]
pub struct Linear {
    matrix: Tensor,
    bias: Option<Tensor>,
    input_size: i64,
}

impl Linear {
    pub fn new(vs: &Path, input_size: i64, output_size: i64, config: LinearConfig) -> Self {
        let matrix = vs.var(
            "matrix",
            &[input_size, output_size],
            xavier_uniform(input_size, output_size),
        );
        let bias = config
            .bias
            .then(|| vs.var("bias", &[output_size], Init::Const(config.bias_start)));
        Linear {
            matrix,
            bias,
            input_size,
        }
    }

    /// Takes `[batch, n_i]` tensors whose `n_i` sum to the input size and
    /// returns `[batch, output_size]`.
    pub fn forward(&self, args: &[&Tensor]) -> Result<Tensor> {
        let shapes: Vec<Vec<i64>> = args.iter().map(|a| a.size()).collect();
        if shapes.is_empty() {
            return Err(Error::ShapeMismatch(
                "linear expects at least one argument".to_string(),
            ));
        }
        let mut total_arg_size = 0;
        for shape in &shapes {
            if shape.len() != 2 {
                return Err(Error::ShapeMismatch(format!(
                    "linear is expecting 2D arguments: {shapes:?}"
                )));
            }
            if shape[1] == 0 {
                return Err(Error::ShapeMismatch(format!(
                    "linear expects a feature dimension on every argument: {shapes:?}"
                )));
            }
            total_arg_size += shape[1];
        }
        if total_arg_size != self.input_size {
            return Err(Error::ShapeMismatch(format!(
                "linear was built for {} input features, got {total_arg_size}: {shapes:?}",
                self.input_size
            )));
        }

        let input = match args {
            [single] => single.shallow_clone(),
            _ => Tensor::cat(args, 1),
        };
        let res = input.matmul(&self.matrix);
        Ok(match &self.bias {
            Some(bias) => res + bias,
            None => res,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Tanh,
    Relu,
    Sigmoid,
    Identity,
}

impl Activation {
    pub fn apply(self, xs: &Tensor) -> Tensor {
        match self {
            Activation::Tanh => xs.tanh(),
            Activation::Relu => xs.relu(),
            Activation::Sigmoid => xs.sigmoid(),
            Activation::Identity => xs.shallow_clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HighwayConfig {
    pub num_layers: usize,
    /// Added to the transform gate pre-activation. Negative values start
    /// the layer out close to the identity.
    pub gate_bias: f64,
    pub activation: Activation,
}

impl Default for HighwayConfig {
    fn default() -> Self {
        HighwayConfig {
            num_layers: 1,
            gate_bias: -2.0,
            activation: Activation::Tanh,
        }
    }
}

/// Highway network (Srivastava et al., 2015):
///   t = sigmoid(W_t y + b)
///   z = t * f(W_h y) + (1 - t) * y
#[derive(Debug)]
pub struct Highway {
    layers: Vec<HighwayLayer>,
    size: i64,
    config: HighwayConfig,
}

#[derive(Debug)]
struct HighwayLayer {
    nonlinear: Linear,
    gate: Linear,
}

impl Highway {
    pub fn new(vs: &Path, size: i64, config: HighwayConfig) -> Result<Self> {
        if config.num_layers == 0 {
            return Err(Error::InvalidConfig(
                "highway needs at least one layer".to_string(),
            ));
        }
        let no_bias = LinearConfig {
            bias: false,
            ..Default::default()
        };
        let layers = (0..config.num_layers)
            .map(|idx| HighwayLayer {
                nonlinear: Linear::new(&(vs / format!("nonlin_{idx}")), size, size, no_bias),
                gate: Linear::new(&(vs / format!("gate_{idx}")), size, size, no_bias),
            })
            .collect();
        Ok(Highway {
            layers,
            size,
            config,
        })
    }

    /// Inputs are concatenated along dim 1 and must total `[batch, size]`.
    pub fn forward(&self, inputs: &[&Tensor]) -> Result<Tensor> {
        let mut input = match inputs {
            [] => {
                return Err(Error::ShapeMismatch(
                    "highway expects at least one input".to_string(),
                ));
            }
            [single] => single.shallow_clone(),
            _ => Tensor::cat(inputs, 1),
        };
        let shape = input.size();
        if shape.len() != 2 {
            return Err(Error::ShapeMismatch(format!(
                "highway is expecting 2D arguments: {shape:?}"
            )));
        }
        if shape[1] != self.size {
            return Err(Error::ShapeMismatch(format!(
                "highway was built for {} features, got {shape:?}",
                self.size
            )));
        }

        for layer in &self.layers {
            let output = self
                .config
                .activation
                .apply(&layer.nonlinear.forward(&[&input])?);
            let transform_gate = (layer.gate.forward(&[&input])? + self.config.gate_bias).sigmoid();
            let carry_gate = transform_gate.neg() + 1.0;
            input = &transform_gate * output + carry_gate * &input;
        }
        Ok(input)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// Output width is `ceil(width / stride)`; odd padding goes on the right.
    Same,
    /// No padding; the kernel only visits complete windows.
    Valid,
}

#[derive(Debug, Clone, Copy)]
pub struct Conv1dConfig {
    pub kernel_width: i64,
    pub stride: i64,
    pub padding: Padding,
}

impl Conv1dConfig {
    pub fn new(kernel_width: i64) -> Self {
        Conv1dConfig {
            kernel_width,
            stride: 1,
            padding: Padding::Same,
        }
    }
}

/// 1D convolution over `[batch, width, channels]` sequences such as embedded text.
#[derive(Debug)]
pub struct Conv1d {
    weight: Tensor,
    bias: Tensor,
    in_channels: i64,
    config: Conv1dConfig,
}

impl Conv1d {
    pub fn new(
        vs: &Path,
        in_channels: i64,
        out_channels: i64,
        config: Conv1dConfig,
    ) -> Result<Self> {
        if config.kernel_width <= 0 || config.stride <= 0 {
            return Err(Error::InvalidConfig(format!(
                "conv1d needs a positive kernel width and stride, got {config:?}"
            )));
        }
        let k = config.kernel_width;
        // Stored as [out, in, k], the layout torch's conv1d expects.
        let weight = vs.var(
            "w_conv",
            &[out_channels, in_channels, k],
            xavier_uniform(in_channels * k, out_channels * k),
        );
        let bias = vs.var("b_conv", &[out_channels], Init::Const(0.0));
        Ok(Conv1d {
            weight,
            bias,
            in_channels,
            config,
        })
    }

    pub fn forward(&self, inputs: &Tensor) -> Result<Tensor> {
        let shape = inputs.size();
        if shape.len() != 3 || shape[2] != self.in_channels {
            return Err(Error::ShapeMismatch(format!(
                "conv1d expects [batch, width, {}], got {shape:?}",
                self.in_channels
            )));
        }
        let width = shape[1];
        let Conv1dConfig {
            kernel_width,
            stride,
            padding,
        } = self.config;

        // [batch, width, channels] -> [batch, channels, width]
        let mut xs = inputs.transpose(1, 2);
        match padding {
            Padding::Same if width == 0 => {
                let out_channels = self.weight.size()[0];
                return Ok(Tensor::zeros(
                    [shape[0], 0, out_channels],
                    (inputs.kind(), inputs.device()),
                ));
            }
            Padding::Same => {
                let out_width = (width + stride - 1) / stride;
                let total = ((out_width - 1) * stride + kernel_width - width).max(0);
                let left = total / 2;
                let options = (inputs.kind(), inputs.device());
                let left_pad = Tensor::zeros([shape[0], self.in_channels, left], options);
                let right_pad = Tensor::zeros([shape[0], self.in_channels, total - left], options);
                xs = Tensor::cat(&[&left_pad, &xs, &right_pad], 2);
            }
            Padding::Valid => {
                if width < kernel_width {
                    return Err(Error::ShapeMismatch(format!(
                        "conv1d kernel of width {kernel_width} does not fit input of width {width}"
                    )));
                }
            }
        }
        let conv_out = xs.conv1d(
            &self.weight,
            Some(&self.bias),
            [stride].as_slice(),
            [0i64].as_slice(),
            [1i64].as_slice(),
            1,
        );
        Ok(conv_out.transpose(1, 2))
    }
}

/// Writes the names of the store's variables, trainable ones first and,
/// when `rest` is set, the remaining ones after.
pub fn describe_variables<W: Write + ?Sized>(
    var_store: &VarStore,
    out: &mut W,
    trainable: bool,
    rest: bool,
) -> io::Result<()> {
    let mut variables: Vec<(String, bool)> = var_store
        .variables()
        .into_iter()
        .map(|(name, tensor)| (name, tensor.requires_grad()))
        .collect();
    variables.sort();
    if trainable {
        writeln!(out, "\nTrainable:")?;
        for (name, _) in variables.iter().filter(|(_, grad)| *grad) {
            writeln!(out, "{name}")?;
        }
    }
    if rest {
        writeln!(out, "\nOthers:")?;
        for (name, _) in variables.iter().filter(|(_, grad)| !*grad) {
            writeln!(out, "{name}")?;
        }
    }
    Ok(())
}
