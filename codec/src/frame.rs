//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//


//! Logical command frame

use std::fmt;

/// One decoded message: field 0 is the command code, the rest are arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    fields: Vec<String>,
}

impl Frame {
    /// Build a frame from any sequence of string-like fields
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a frame from a command code and its arguments
    pub fn command<C, I, S>(code: C, args: I) -> Self
    where
        C: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fields = vec![code.into()];
        fields.extend(args.into_iter().map(Into::into));
        Self { fields }
    }

    /// The command code, or `""` for a frame without fields
    pub fn code(&self) -> &str {
        self.fields.first().map(String::as_str).unwrap_or("")
    }

    /// Arguments following the command code
    pub fn args(&self) -> &[String] {
        self.fields.get(1..).unwrap_or(&[])
    }

    /// Argument at `index` (0 is the first argument after the code)
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args().get(index).map(String::as_str)
    }

    /// All fields including the code
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Number of fields including the code
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the frame carries no fields at all
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Consume the frame, returning its fields
    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }
}

impl From<Vec<String>> for Frame {
    fn from(fields: Vec<String>) -> Self {
        Self { fields }
    }
}

impl From<Frame> for Vec<String> {
    fn from(frame: Frame) -> Self {
        frame.fields
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields.join(" "))
    }
}
