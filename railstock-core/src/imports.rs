#![allow(unused_imports)]

pub(crate) use crate::error::Error;
pub(crate) use crate::filter::IirFilter;
pub(crate) use crate::integrator::{IntegratorMethod, Integrator};
pub(crate) use crate::interp::{Interpolator, Interpolator2D};
pub(crate) use crate::lin_search_hint::*;
pub(crate) use crate::si;
pub(crate) use crate::traits::*;
pub(crate) use crate::uc;
pub(crate) use crate::utils;
pub(crate) use crate::utils::{almost_eq, almost_eq_uom, almost_le};
pub(crate) use anyhow::{anyhow, bail, ensure, Context};
pub(crate) use derive_more::IsVariant;
pub(crate) use railstock_proc_macros::HistoryVec;
pub(crate) use serde::{Deserialize, Serialize};
pub(crate) use std::cell::Cell;
pub(crate) use std::fmt;
pub(crate) use std::io::{Read, Write};
pub(crate) use std::path::Path;
pub(crate) use uom::ConstZero;
