use std::time::Instant;

use anyhow::{Result, anyhow};
use nokhwa::{Buffer, utils::FrameFormat};
use rayon::prelude::*;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPackedImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_rgba, yuyv422_to_rgba,
};
use zune_jpeg::{
    JpegDecoder,
    zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
};

use crate::types::Frame;

/// Decodes a captured buffer of any supported pixel format into an RGBA frame.
pub fn decode_frame(buffer: &Buffer) -> Result<Frame> {
    let resolution = buffer.resolution();
    let (width, height) = (resolution.width_x, resolution.height_y);
    let data = buffer.buffer();
    let pixels = width as usize * height as usize;

    let (rgba, width, height) = match buffer.source_frame_format() {
        FrameFormat::MJPEG => decode_mjpeg(data)?,
        FrameFormat::NV12 => {
            require_len(data, pixels + pixels / 2, "NV12")?;
            (nv12(data, width, height)?, width, height)
        }
        FrameFormat::YUYV => {
            require_len(data, pixels * 2, "YUYV")?;
            (yuyv(data, width, height)?, width, height)
        }
        FrameFormat::RAWRGB => {
            require_len(data, pixels * 3, "RGB")?;
            (expand_rgb(data, pixels, false), width, height)
        }
        FrameFormat::RAWBGR => {
            require_len(data, pixels * 3, "BGR")?;
            (expand_rgb(data, pixels, true), width, height)
        }
        FrameFormat::GRAY => {
            require_len(data, pixels, "GRAY")?;
            (expand_gray(data, pixels), width, height)
        }
    };

    Ok(Frame {
        rgba,
        width,
        height,
        timestamp: Instant::now(),
    })
}

fn require_len(data: &[u8], expected: usize, label: &str) -> Result<()> {
    if data.len() < expected {
        return Err(anyhow!(
            "{label} buffer too small: got {}, expected {expected}",
            data.len()
        ));
    }
    Ok(())
}

fn nv12(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let luma_len = width as usize * height as usize;
    let image = YuvBiPlanarImage {
        y_plane: &data[..luma_len],
        y_stride: width,
        uv_plane: &data[luma_len..luma_len + luma_len / 2],
        uv_stride: width,
        width,
        height,
    };
    let mut rgba = vec![0u8; luma_len * 4];
    yuv_nv12_to_rgba(
        &image,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
        YuvConversionMode::Balanced,
    )
    .map_err(|err| anyhow!("NV12 conversion failed: {err:?}"))?;
    Ok(rgba)
}

fn yuyv(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let packed = YuvPackedImage {
        yuy: data,
        yuy_stride: width * 2,
        width,
        height,
    };
    let mut rgba = vec![0u8; width as usize * height as usize * 4];
    yuyv422_to_rgba(
        &packed,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
    )
    .map_err(|err| anyhow!("YUYV conversion failed: {err:?}"))?;
    Ok(rgba)
}

/// MJPEG frames carry their own dimensions, which win over the negotiated ones.
fn decode_mjpeg(data: &[u8]) -> Result<(Vec<u8>, u32, u32)> {
    let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGBA);
    let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);
    let rgba = decoder
        .decode()
        .map_err(|err| anyhow!("MJPEG decode failed: {err:?}"))?;
    let info = decoder
        .info()
        .ok_or_else(|| anyhow!("MJPEG decoder returned no image info"))?;
    let (width, height) = (u32::from(info.width), u32::from(info.height));
    require_len(&rgba, width as usize * height as usize * 4, "MJPEG output")?;
    Ok((rgba, width, height))
}

fn expand_rgb(data: &[u8], pixels: usize, swap_rb: bool) -> Vec<u8> {
    let mut rgba = vec![255u8; pixels * 4];
    rgba.par_chunks_exact_mut(4)
        .zip(data.par_chunks_exact(3))
        .for_each(|(dst, src)| {
            let (r, b) = if swap_rb { (src[2], src[0]) } else { (src[0], src[2]) };
            dst[0] = r;
            dst[1] = src[1];
            dst[2] = b;
        });
    rgba
}

fn expand_gray(data: &[u8], pixels: usize) -> Vec<u8> {
    let mut rgba = vec![255u8; pixels * 4];
    rgba.par_chunks_exact_mut(4)
        .zip(data[..pixels].par_iter())
        .for_each(|(dst, &v)| dst[..3].fill(v));
    rgba
}
